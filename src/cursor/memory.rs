//! Memory Cursor - In-memory point source
//!
//! Serves points already decoded into memory through the `PointCursor`
//! contract. Storage read paths that materialize a chunk use it directly,
//! and tests use it to drive aggregate cursors with controlled batch sizes
//! and injected storage failures.

use crate::cursor::{ArrayBatch, CursorStats, PointCursor};
use crate::error::Error;
use crate::types::{PointValue, Timestamp};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default number of points per pulled batch
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Shared handle counting how many times a cursor was closed
#[derive(Debug, Clone, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    /// Number of `close` calls observed so far
    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn record(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}

/// Cursor over an in-memory, time-ordered list of points
pub struct MemoryCursor<T> {
    /// Points, sorted by timestamp
    points: Vec<(Timestamp, T)>,

    /// Next point to serve
    position: usize,

    /// Maximum points per pulled batch
    batch_size: usize,

    /// Error reported once the points run out
    error: Option<Error>,

    /// Error surfaced through `err`
    reported: Option<Error>,

    /// Scan counters
    stats: CursorStats,

    /// Whether `close` has been called
    closed: bool,

    /// Counts every `close` call, repeated ones included
    close_counter: CloseCounter,
}

impl<T: PointValue> MemoryCursor<T> {
    /// Create a cursor over the given points
    ///
    /// Points are expected in non-decreasing timestamp order.
    pub fn new(points: Vec<(Timestamp, T)>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].0 <= w[1].0));
        Self {
            points,
            position: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            error: None,
            reported: None,
            stats: CursorStats::default(),
            closed: false,
            close_counter: CloseCounter::default(),
        }
    }

    /// Create a cursor from a columnar batch
    pub fn from_batch(batch: ArrayBatch<T>) -> Self {
        Self::new(batch.timestamps.into_iter().zip(batch.values).collect())
    }

    /// Set batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Fail the stream with `error` once the points are exhausted
    ///
    /// Simulates a storage read that breaks after delivering a prefix of the
    /// series.
    pub fn with_error(mut self, error: Error) -> Self {
        self.error = Some(error);
        self
    }

    /// Handle observing how many times this cursor gets closed
    pub fn close_counter(&self) -> CloseCounter {
        self.close_counter.clone()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<T: PointValue> PointCursor for MemoryCursor<T> {
    type Value = T;

    fn next_batch(&mut self) -> ArrayBatch<T> {
        if self.closed {
            return ArrayBatch::default();
        }
        // The injected error only surfaces once every point was delivered
        if self.position >= self.points.len() {
            if self.reported.is_none() {
                self.reported = self.error.take();
            }
            return ArrayBatch::default();
        }

        let end = (self.position + self.batch_size).min(self.points.len());
        let mut batch = ArrayBatch::with_capacity(end - self.position);
        for (ts, value) in &self.points[self.position..end] {
            batch.push(*ts, value.clone());
        }
        self.position = end;

        self.stats.add(CursorStats {
            scanned_values: batch.len() as u64,
            scanned_bytes: batch.memory_size() as u64,
        });
        batch
    }

    fn close(&mut self) {
        self.close_counter.record();
        if self.closed {
            return;
        }
        self.closed = true;
        self.points = Vec::new();
        self.error = None;
    }

    fn err(&self) -> Option<&Error> {
        self.reported.as_ref()
    }

    fn stats(&self) -> CursorStats {
        self.stats
    }
}
