//! Series Aggregate Cursor - Whole-series reduction
//!
//! Reduces every point of the wrapped cursor to a single row. The first pull
//! drains the input; the row carries the timestamp of the first point seen.
//! An empty input produces no row at all, for every aggregate kind.

use crate::cursor::reducer::Reducer;
use crate::cursor::{ArrayBatch, CursorStats, PointCursor};
use crate::error::Error;
use crate::types::Timestamp;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Exhausted,
    Closed,
}

/// Cursor producing one aggregate row for the whole input
pub struct SeriesAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    /// Wrapped point cursor, owned exclusively
    input: C,

    /// Accumulation state
    reducer: R,

    state: State,

    /// Whether `input.close()` has been called
    input_closed: bool,
}

impl<C, R> SeriesAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    /// Wrap a point cursor
    pub fn new(input: C) -> Self {
        Self {
            input,
            reducer: R::default(),
            state: State::Pending,
            input_closed: false,
        }
    }

    fn close_input(&mut self) {
        if !self.input_closed {
            self.input_closed = true;
            self.input.close();
        }
    }
}

impl<C, R> PointCursor for SeriesAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    type Value = R::Output;

    fn next_batch(&mut self) -> ArrayBatch<R::Output> {
        if self.state != State::Pending {
            return ArrayBatch::default();
        }

        let mut first_timestamp: Option<Timestamp> = None;
        loop {
            let batch = self.input.next_batch();
            if batch.is_empty() {
                break;
            }
            if first_timestamp.is_none() {
                first_timestamp = batch.timestamps.first().copied();
            }
            self.reducer.accumulate_batch(&batch);
        }
        self.state = State::Exhausted;

        let mut out = ArrayBatch::with_capacity(1);
        match self.input.err() {
            Some(err) => {
                warn!(kind = %R::KIND, error = %err, "Input cursor failed, dropping series aggregate");
            },
            None => {
                if let (Some(ts), Some(value)) = (first_timestamp, self.reducer.emit()) {
                    out.push(ts, value);
                }
            },
        }
        self.close_input();

        debug!(kind = %R::KIND, rows = out.len(), "Series aggregate exhausted");
        out
    }

    fn close(&mut self) {
        self.state = State::Closed;
        self.close_input();
    }

    fn err(&self) -> Option<&Error> {
        self.input.err()
    }

    fn stats(&self) -> CursorStats {
        self.input.stats()
    }
}

impl<C, R> Drop for SeriesAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    fn drop(&mut self) {
        self.close_input();
    }
}
