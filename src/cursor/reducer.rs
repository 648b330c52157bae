//! Reducers - Per-kind accumulation rules
//!
//! One reducer type per aggregate kind, generic over the input value type so
//! each (type, kind) pair compiles to its own monomorphized loop:
//! - Count: number of points, any input type, emits `i64`
//! - Sum: wrapping integer / IEEE float addition, numeric inputs only
//! - Mean: f64 running sum divided by count, numeric inputs only
//! - Min/Max: extreme value, first occurrence wins ties, numeric inputs only
//! - First/Last: earliest / latest value, any input type
//!
//! Reducers assume points arrive in timestamp order, which every
//! `PointCursor` guarantees.

use crate::cursor::ArrayBatch;
use crate::types::{AggregateKind, Numeric, PointValue, Timestamp};
use std::marker::PhantomData;

/// Incremental reduction over a stream of points
///
/// `emit` returns the aggregate of everything accumulated since the previous
/// `emit` (or since construction) and resets the reducer. It returns `None`
/// when nothing was accumulated.
pub trait Reducer<T>: Default + Send {
    /// Output value type
    type Output: PointValue;

    /// Aggregate kind this reducer implements
    const KIND: AggregateKind;

    /// Fold one point into the state
    fn accumulate(&mut self, timestamp: Timestamp, value: &T);

    /// Fold a whole batch into the state
    fn accumulate_batch(&mut self, batch: &ArrayBatch<T>) {
        for (ts, value) in batch.iter() {
            self.accumulate(ts, value);
        }
    }

    /// Take the aggregate and reset
    fn emit(&mut self) -> Option<Self::Output>;
}

// ============================================================================
// Count
// ============================================================================

/// Counts points regardless of value
#[derive(Debug, Clone, Default)]
pub struct CountReducer {
    count: i64,
}

impl<T: PointValue> Reducer<T> for CountReducer {
    type Output = i64;
    const KIND: AggregateKind = AggregateKind::Count;

    #[inline]
    fn accumulate(&mut self, _timestamp: Timestamp, _value: &T) {
        self.count += 1;
    }

    fn accumulate_batch(&mut self, batch: &ArrayBatch<T>) {
        self.count += batch.len() as i64;
    }

    fn emit(&mut self) -> Option<i64> {
        match std::mem::take(&mut self.count) {
            0 => None,
            n => Some(n),
        }
    }
}

// ============================================================================
// Sum
// ============================================================================

/// Sums values in the input's own numeric domain
///
/// Integer sums wrap on overflow. That is the defined numeric semantic of
/// the engine, not an error condition.
#[derive(Debug, Clone)]
pub struct SumReducer<T> {
    sum: T,
    seen: bool,
}

impl<T: Numeric> Default for SumReducer<T> {
    fn default() -> Self {
        Self {
            sum: T::zero(),
            seen: false,
        }
    }
}

impl<T: Numeric> Reducer<T> for SumReducer<T> {
    type Output = T;
    const KIND: AggregateKind = AggregateKind::Sum;

    #[inline]
    fn accumulate(&mut self, _timestamp: Timestamp, value: &T) {
        self.sum = self.sum.add(*value);
        self.seen = true;
    }

    fn emit(&mut self) -> Option<T> {
        let state = std::mem::take(self);
        state.seen.then_some(state.sum)
    }
}

// ============================================================================
// Mean
// ============================================================================

/// Arithmetic mean computed as an f64 running sum over a count
#[derive(Debug, Clone)]
pub struct MeanReducer<T> {
    sum: f64,
    count: u64,
    _input: PhantomData<fn(T)>,
}

impl<T> Default for MeanReducer<T> {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            _input: PhantomData,
        }
    }
}

impl<T: Numeric> Reducer<T> for MeanReducer<T> {
    type Output = f64;
    const KIND: AggregateKind = AggregateKind::Mean;

    #[inline]
    fn accumulate(&mut self, _timestamp: Timestamp, value: &T) {
        self.sum += value.as_f64();
        self.count += 1;
    }

    fn emit(&mut self) -> Option<f64> {
        let state = std::mem::take(self);
        (state.count > 0).then(|| state.sum / state.count as f64)
    }
}

// ============================================================================
// Min / Max
// ============================================================================

/// Smallest value seen; a later equal value never replaces an earlier one
#[derive(Debug, Clone)]
pub struct MinReducer<T> {
    min: Option<T>,
}

impl<T> Default for MinReducer<T> {
    fn default() -> Self {
        Self { min: None }
    }
}

impl<T: Numeric> Reducer<T> for MinReducer<T> {
    type Output = T;
    const KIND: AggregateKind = AggregateKind::Min;

    #[inline]
    fn accumulate(&mut self, _timestamp: Timestamp, value: &T) {
        match self.min {
            Some(current) if *value < current => self.min = Some(*value),
            Some(_) => {},
            None => self.min = Some(*value),
        }
    }

    fn emit(&mut self) -> Option<T> {
        self.min.take()
    }
}

/// Largest value seen; a later equal value never replaces an earlier one
#[derive(Debug, Clone)]
pub struct MaxReducer<T> {
    max: Option<T>,
}

impl<T> Default for MaxReducer<T> {
    fn default() -> Self {
        Self { max: None }
    }
}

impl<T: Numeric> Reducer<T> for MaxReducer<T> {
    type Output = T;
    const KIND: AggregateKind = AggregateKind::Max;

    #[inline]
    fn accumulate(&mut self, _timestamp: Timestamp, value: &T) {
        match self.max {
            Some(current) if *value > current => self.max = Some(*value),
            Some(_) => {},
            None => self.max = Some(*value),
        }
    }

    fn emit(&mut self) -> Option<T> {
        self.max.take()
    }
}

// ============================================================================
// First / Last
// ============================================================================

/// Value of the first point accumulated
#[derive(Debug, Clone)]
pub struct FirstReducer<T> {
    first: Option<T>,
}

impl<T> Default for FirstReducer<T> {
    fn default() -> Self {
        Self { first: None }
    }
}

impl<T: PointValue> Reducer<T> for FirstReducer<T> {
    type Output = T;
    const KIND: AggregateKind = AggregateKind::First;

    #[inline]
    fn accumulate(&mut self, _timestamp: Timestamp, value: &T) {
        if self.first.is_none() {
            self.first = Some(value.clone());
        }
    }

    fn accumulate_batch(&mut self, batch: &ArrayBatch<T>) {
        if self.first.is_none() {
            self.first = batch.values.first().cloned();
        }
    }

    fn emit(&mut self) -> Option<T> {
        self.first.take()
    }
}

/// Value of the most recently accumulated point
#[derive(Debug, Clone)]
pub struct LastReducer<T> {
    last: Option<T>,
}

impl<T> Default for LastReducer<T> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<T: PointValue> Reducer<T> for LastReducer<T> {
    type Output = T;
    const KIND: AggregateKind = AggregateKind::Last;

    #[inline]
    fn accumulate(&mut self, _timestamp: Timestamp, value: &T) {
        self.last = Some(value.clone());
    }

    fn accumulate_batch(&mut self, batch: &ArrayBatch<T>) {
        if let Some(last) = batch.values.last() {
            self.last = Some(last.clone());
        }
    }

    fn emit(&mut self) -> Option<T> {
        self.last.take()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce<T, R: Reducer<T>>(values: &[T]) -> Option<R::Output> {
        let mut reducer = R::default();
        for (i, v) in values.iter().enumerate() {
            reducer.accumulate(i as i64, v);
        }
        reducer.emit()
    }

    #[test]
    fn test_count() {
        assert_eq!(reduce::<bool, CountReducer>(&[true, false, true]), Some(3));
        assert_eq!(reduce::<bool, CountReducer>(&[]), None);
    }

    #[test]
    fn test_sum_wraps() {
        assert_eq!(reduce::<i64, SumReducer<i64>>(&[i64::MAX, 1]), Some(i64::MIN));
        assert_eq!(reduce::<u64, SumReducer<u64>>(&[u64::MAX, u64::MAX]), Some(u64::MAX - 1));
        assert_eq!(reduce::<f64, SumReducer<f64>>(&[0.5, 0.25]), Some(0.75));
    }

    #[test]
    fn test_sum_of_nothing_is_none() {
        assert_eq!(reduce::<i64, SumReducer<i64>>(&[]), None);
    }

    #[test]
    fn test_mean_is_float_for_integers() {
        assert_eq!(reduce::<i64, MeanReducer<i64>>(&[1, 2]), Some(1.5));
        assert_eq!(reduce::<u64, MeanReducer<u64>>(&[10]), Some(10.0));
    }

    #[test]
    fn test_mean_of_large_integers_does_not_overflow() {
        let mean = reduce::<i64, MeanReducer<i64>>(&[i64::MAX, i64::MAX]).unwrap();
        assert!((mean - i64::MAX as f64).abs() < 1e3);
    }

    #[test]
    fn test_min_max() {
        assert_eq!(reduce::<f64, MinReducer<f64>>(&[3.0, 1.0, 4.0, 1.0]), Some(1.0));
        assert_eq!(reduce::<i64, MaxReducer<i64>>(&[-3, 9, 2, 9]), Some(9));
    }

    #[test]
    fn test_min_keeps_first_tie() {
        // -0.0 == 0.0, so the first occurrence must win
        let min = reduce::<f64, MinReducer<f64>>(&[0.0, -0.0]).unwrap();
        assert!(min.is_sign_positive());
        let max = reduce::<f64, MaxReducer<f64>>(&[-0.0, 0.0]).unwrap();
        assert!(max.is_sign_negative());
    }

    #[test]
    fn test_first_last() {
        let values = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(
            reduce::<String, FirstReducer<String>>(&values),
            Some("a".to_string())
        );
        assert_eq!(
            reduce::<String, LastReducer<String>>(&values),
            Some("c".to_string())
        );
    }

    #[test]
    fn test_batch_accumulation_matches_point_accumulation() {
        let batch = ArrayBatch::new(vec![1, 2, 3], vec![5u64, 7, 6]);

        let mut count = CountReducer::default();
        Reducer::<u64>::accumulate_batch(&mut count, &batch);
        assert_eq!(Reducer::<u64>::emit(&mut count), Some(3));

        let mut first = FirstReducer::default();
        first.accumulate_batch(&batch);
        first.accumulate_batch(&ArrayBatch::new(vec![4], vec![1u64]));
        assert_eq!(first.emit(), Some(5));

        let mut last = LastReducer::default();
        last.accumulate_batch(&batch);
        last.accumulate_batch(&ArrayBatch::default());
        assert_eq!(last.emit(), Some(6));
    }

    #[test]
    fn test_emit_resets() {
        let mut sum = SumReducer::<i64>::default();
        sum.accumulate(0, &4);
        assert_eq!(sum.emit(), Some(4));
        assert_eq!(sum.emit(), None);
        sum.accumulate(1, &2);
        assert_eq!(sum.emit(), Some(2));
    }
}
