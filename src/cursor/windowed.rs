//! Window Aggregate Cursor - Per-window reduction
//!
//! Groups the points of the wrapped cursor into time windows and produces one
//! row per non-empty window, timestamped with the window start and ordered by
//! start. Output is paginated: no page holds more than `max_points_per_block`
//! rows, and a page is returned as soon as it is full.
//!
//! Points are pulled lazily. The cursor keeps the unread tail of the current
//! input batch plus the set of windows that may still receive points, so
//! memory stays bounded by the input batch size and the window overlap.
//!
//! # State machine
//!
//! ```text
//! Active ──input empty, no error──> Draining ──open windows flushed──> Exhausted
//!    │                                                                    ^
//!    └───────────────input empty with error (windows discarded)───────────┘
//! any state ──close──> Closed
//! ```

use crate::cursor::reducer::Reducer;
use crate::cursor::{ArrayBatch, CursorStats, PointCursor};
use crate::error::Error;
use crate::window::{Bounds, Window};
use std::collections::VecDeque;
use tracing::{debug, trace, warn};

/// Lifecycle of a windowed aggregate cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Pulling from the wrapped cursor
    Active,
    /// Input exhausted, flushing the remaining open windows
    Draining,
    /// Every row has been produced
    Exhausted,
    /// Closed by the caller
    Closed,
}

/// A window that has received at least one point and not been flushed
struct OpenWindow<R> {
    index: i64,
    bounds: Bounds,
    reducer: R,
}

/// Cursor producing one aggregate row per time window
pub struct WindowAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    /// Wrapped point cursor, owned exclusively
    input: C,

    /// Window boundary calculator
    window: Window,

    /// Page size limit
    max_points: usize,

    /// Current input batch and read position within it
    pending: ArrayBatch<C::Value>,
    position: usize,

    /// Open windows, ordered by index
    open: VecDeque<OpenWindow<R>>,

    state: CursorState,

    /// Whether `input.close()` has been called
    input_closed: bool,

    /// Rows produced so far
    rows_emitted: u64,
}

impl<C, R> WindowAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    /// Wrap a point cursor
    ///
    /// `max_points_per_block` is raised to 1 if zero.
    pub fn new(input: C, window: Window, max_points_per_block: usize) -> Self {
        Self {
            input,
            window,
            max_points: max_points_per_block.max(1),
            pending: ArrayBatch::default(),
            position: 0,
            open: VecDeque::new(),
            state: CursorState::Active,
            input_closed: false,
            rows_emitted: 0,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Window boundary calculator in use
    pub fn window(&self) -> &Window {
        &self.window
    }

    fn close_input(&mut self) {
        if !self.input_closed {
            self.input_closed = true;
            self.input.close();
        }
    }

    fn finish(&mut self) {
        self.state = CursorState::Exhausted;
        self.pending = ArrayBatch::default();
        self.position = 0;
        self.close_input();
        debug!(
            kind = %R::KIND,
            rows = self.rows_emitted,
            "Window aggregate exhausted"
        );
    }

    /// Make sure unread input is available; false at end of input
    fn fill_pending(&mut self) -> bool {
        if self.position < self.pending.len() {
            return true;
        }
        self.pending = self.input.next_batch();
        self.position = 0;
        !self.pending.is_empty()
    }

    fn flush(window: OpenWindow<R>, out: &mut ArrayBatch<R::Output>) {
        let OpenWindow {
            bounds,
            mut reducer,
            ..
        } = window;
        if let Some(value) = reducer.emit() {
            out.push(bounds.start, value);
        }
    }

    /// Fold unread input points into their windows
    ///
    /// Returns true when `out` is full. A point is only consumed once every
    /// window ending at or before it has been flushed.
    fn consume(&mut self, out: &mut ArrayBatch<R::Output>) -> bool {
        let overlapping = self.window.is_overlapping();

        while self.position < self.pending.len() {
            let ts = self.pending.timestamps[self.position];

            if !overlapping {
                if let Some(back) = self.open.back_mut() {
                    if back.bounds.contains(ts) {
                        back.reducer
                            .accumulate(ts, &self.pending.values[self.position]);
                        self.position += 1;
                        continue;
                    }
                }
            }

            while self.open.front().is_some_and(|w| w.bounds.ends_before(ts)) {
                if out.len() >= self.max_points {
                    return true;
                }
                if let Some(done) = self.open.pop_front() {
                    Self::flush(done, out);
                }
            }

            if let Some((earliest, latest)) = self.window.indexes_containing(ts) {
                let first_new = match self.open.back() {
                    Some(back) => earliest.max(back.index.saturating_add(1)),
                    None => earliest,
                };
                for index in first_new..=latest {
                    self.open.push_back(OpenWindow {
                        index,
                        bounds: self.window.bounds_at(index),
                        reducer: R::default(),
                    });
                }

                let value = &self.pending.values[self.position];
                for open in self.open.iter_mut() {
                    open.reducer.accumulate(ts, value);
                }
            }
            self.position += 1;

            if out.len() >= self.max_points {
                return true;
            }
        }
        false
    }
}

impl<C, R> PointCursor for WindowAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    type Value = R::Output;

    fn next_batch(&mut self) -> ArrayBatch<R::Output> {
        if matches!(self.state, CursorState::Exhausted | CursorState::Closed) {
            return ArrayBatch::default();
        }

        let mut out = ArrayBatch::with_capacity(self.max_points);
        loop {
            match self.state {
                CursorState::Exhausted | CursorState::Closed => break,
                CursorState::Active => {
                    if self.fill_pending() {
                        if self.consume(&mut out) {
                            break;
                        }
                        continue;
                    }

                    let failed = match self.input.err() {
                        Some(err) => {
                            warn!(
                                kind = %R::KIND,
                                error = %err,
                                open_windows = self.open.len(),
                                "Input cursor failed, discarding open windows"
                            );
                            true
                        },
                        None => false,
                    };
                    if failed {
                        self.open.clear();
                        self.finish();
                    } else {
                        self.state = CursorState::Draining;
                    }
                },
                CursorState::Draining => {
                    while out.len() < self.max_points {
                        match self.open.pop_front() {
                            Some(done) => Self::flush(done, &mut out),
                            None => break,
                        }
                    }
                    if self.open.is_empty() {
                        self.finish();
                    }
                    break;
                },
            }
        }

        self.rows_emitted += out.len() as u64;
        trace!(kind = %R::KIND, rows = out.len(), state = ?self.state, "Window aggregate page");
        out
    }

    fn close(&mut self) {
        if self.state == CursorState::Closed {
            return;
        }
        self.state = CursorState::Closed;
        self.open.clear();
        self.pending = ArrayBatch::default();
        self.position = 0;
        self.close_input();
    }

    fn err(&self) -> Option<&Error> {
        self.input.err()
    }

    fn stats(&self) -> CursorStats {
        self.input.stats()
    }
}

impl<C, R> Drop for WindowAggregateCursor<C, R>
where
    C: PointCursor,
    R: Reducer<C::Value>,
{
    fn drop(&mut self) {
        self.close_input();
    }
}
