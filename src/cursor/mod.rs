//! Point Cursors - Pull-based columnar batch streams
//!
//! This module defines the contract every cursor follows:
//! - `ArrayBatch<T>` is the columnar unit of transfer (timestamps + values)
//! - `PointCursor` is the pull interface shared by storage cursors and
//!   aggregate cursors alike
//! - `TypedCursor` erases the value type at the factory boundary
//!
//! A cursor is drained by calling `next_batch` until it returns an empty
//! batch. The caller must then check `err` to tell a clean end of stream from
//! a failure, and call `close` exactly once.

pub mod aggregate;
pub mod memory;
pub mod reducer;
pub mod windowed;

pub use aggregate::SeriesAggregateCursor;
pub use memory::{CloseCounter, MemoryCursor};
pub use reducer::{
    CountReducer, FirstReducer, LastReducer, MaxReducer, MeanReducer, MinReducer, Reducer,
    SumReducer,
};
pub use windowed::WindowAggregateCursor;

use crate::error::{Error, Result};
use crate::types::{PointValue, Timestamp, ValueType};

// ============================================================================
// Array Batch
// ============================================================================

/// A batch of points of a single value type
///
/// Columnar layout: `timestamps[i]` belongs to `values[i]`. Timestamps are
/// non-decreasing within a batch and across successive batches of the same
/// cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBatch<T> {
    /// Timestamps in nanoseconds
    pub timestamps: Vec<Timestamp>,

    /// Values, parallel to `timestamps`
    pub values: Vec<T>,
}

impl<T> ArrayBatch<T> {
    /// Create a new empty batch with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Create a batch from parallel vectors
    pub fn new(timestamps: Vec<Timestamp>, values: Vec<T>) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self { timestamps, values }
    }

    /// Number of rows in the batch
    #[inline]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if batch is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Add a row to the batch
    #[inline]
    pub fn push(&mut self, timestamp: Timestamp, value: T) {
        self.timestamps.push(timestamp);
        self.values.push(value);
    }

    /// Append another batch to this one
    pub fn extend(&mut self, other: ArrayBatch<T>) {
        self.timestamps.extend(other.timestamps);
        self.values.extend(other.values);
    }

    /// Iterate over `(timestamp, &value)` rows
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, &T)> {
        self.timestamps.iter().copied().zip(self.values.iter())
    }
}

impl<T: PointValue> ArrayBatch<T> {
    /// Memory size in bytes (timestamps plus encoded values)
    pub fn memory_size(&self) -> usize {
        self.timestamps.len() * 8 + self.values.iter().map(|v| v.encoded_size()).sum::<usize>()
    }
}

impl<T> Default for ArrayBatch<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

// ============================================================================
// Cursor Stats
// ============================================================================

/// Scan counters accumulated by a cursor
///
/// Counters only ever grow over the life of a cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorStats {
    /// Points read from storage
    pub scanned_values: u64,

    /// Bytes read from storage
    pub scanned_bytes: u64,
}

impl CursorStats {
    /// Merge another set of counters into this one
    pub fn add(&mut self, other: CursorStats) {
        self.scanned_values = self.scanned_values.saturating_add(other.scanned_values);
        self.scanned_bytes = self.scanned_bytes.saturating_add(other.scanned_bytes);
    }
}

// ============================================================================
// Cursor Trait
// ============================================================================

/// Pull interface over a stream of typed points
///
/// Cursors are driven by one caller at a time. They are `Send` so they can be
/// handed to a worker thread, but `next_batch` and `close` are never invoked
/// concurrently on the same cursor.
pub trait PointCursor: Send {
    /// Value type of the points produced
    type Value: PointValue;

    /// Pull the next batch of points
    ///
    /// An empty batch signals the end of the stream; check `err` afterwards.
    /// Calling this after the end of stream or after `close` keeps returning
    /// empty batches.
    fn next_batch(&mut self) -> ArrayBatch<Self::Value>;

    /// Release the cursor's resources
    ///
    /// Closing twice is a no-op.
    fn close(&mut self);

    /// Error that terminated the stream, if any
    ///
    /// The error is sticky: it stays available after `close`.
    fn err(&self) -> Option<&Error>;

    /// Scan counters accumulated so far
    fn stats(&self) -> CursorStats;
}

impl<C: PointCursor + ?Sized> PointCursor for Box<C> {
    type Value = C::Value;

    #[inline]
    fn next_batch(&mut self) -> ArrayBatch<Self::Value> {
        (**self).next_batch()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn err(&self) -> Option<&Error> {
        (**self).err()
    }

    fn stats(&self) -> CursorStats {
        (**self).stats()
    }
}

/// Drain a cursor into a single batch
///
/// Pulls until the end of stream, checks `err`, and closes the cursor in
/// every case. Intended for callers that want the whole (bounded) result.
pub fn read_all<C: PointCursor + ?Sized>(cursor: &mut C) -> Result<ArrayBatch<C::Value>> {
    let mut out = ArrayBatch::default();
    loop {
        let batch = cursor.next_batch();
        if batch.is_empty() {
            break;
        }
        out.extend(batch);
    }
    let result = match cursor.err() {
        Some(e) => Err(e.clone()),
        None => Ok(out),
    };
    cursor.close();
    result
}

// ============================================================================
// Typed Cursor
// ============================================================================

/// A point cursor with its value type erased
///
/// Storage read paths hand cursors to the factory in this form, and the
/// factory hands aggregate cursors back the same way.
pub enum TypedCursor {
    /// Float points
    Float(Box<dyn PointCursor<Value = f64>>),
    /// Signed integer points
    Integer(Box<dyn PointCursor<Value = i64>>),
    /// Unsigned integer points
    Unsigned(Box<dyn PointCursor<Value = u64>>),
    /// String points
    String(Box<dyn PointCursor<Value = String>>),
    /// Boolean points
    Boolean(Box<dyn PointCursor<Value = bool>>),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            TypedCursor::Float($c) => $body,
            TypedCursor::Integer($c) => $body,
            TypedCursor::Unsigned($c) => $body,
            TypedCursor::String($c) => $body,
            TypedCursor::Boolean($c) => $body,
        }
    };
}

impl TypedCursor {
    /// Erase the value type of a concrete cursor
    pub fn new<C>(cursor: C) -> Self
    where
        C: PointCursor + 'static,
    {
        C::Value::into_typed(Box::new(cursor))
    }

    /// Value type of the points produced
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedCursor::Float(_) => ValueType::Float,
            TypedCursor::Integer(_) => ValueType::Integer,
            TypedCursor::Unsigned(_) => ValueType::Unsigned,
            TypedCursor::String(_) => ValueType::String,
            TypedCursor::Boolean(_) => ValueType::Boolean,
        }
    }

    /// Recover the typed cursor, or get `self` back if the type differs
    pub fn downcast<T: PointValue>(
        self,
    ) -> std::result::Result<Box<dyn PointCursor<Value = T>>, TypedCursor> {
        T::from_typed(self)
    }

    /// Close the underlying cursor
    pub fn close(&mut self) {
        dispatch!(self, c => c.close())
    }

    /// Error reported by the underlying cursor
    pub fn err(&self) -> Option<&Error> {
        dispatch!(self, c => c.err())
    }

    /// Scan counters of the underlying cursor
    pub fn stats(&self) -> CursorStats {
        dispatch!(self, c => c.stats())
    }
}

impl std::fmt::Debug for TypedCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCursor")
            .field("value_type", &self.value_type())
            .field("stats", &self.stats())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
