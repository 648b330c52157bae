//! Kuba Aggregate - Aggregate and windowed-aggregate cursors for time series
//!
//! This library sits between the storage read path and the query planner:
//! - Wraps a typed point cursor and reduces its points with one of seven
//!   aggregate kinds (count, sum, mean, min, max, first, last)
//! - Reduces the whole series to one row, or one row per time window
//! - Fixed-duration and calendar-month windows, with offsets, gaps and
//!   overlapping windows
//! - Paginated, pull-based output bounded by `max_points_per_block`
//!
//! # Example
//!
//! ```rust
//! use kuba_aggregate::cursor::{read_all, MemoryCursor};
//! use kuba_aggregate::window::{Interval, WindowSpec};
//! use kuba_aggregate::{new_aggregate_cursor, AggregateKind, AggregateRequest, CursorConfig, TypedCursor};
//!
//! let minute = 60_000_000_000i64;
//! let points = (0..120).map(|i| (i * minute, i as f64)).collect();
//! let input = TypedCursor::new(MemoryCursor::new(points));
//!
//! let request = AggregateRequest::windowed(AggregateKind::Max, WindowSpec::tumbling(Interval::hours(1)));
//! let cursor = new_aggregate_cursor(input, &request, &CursorConfig::default()).unwrap();
//!
//! let mut cursor = cursor.downcast::<f64>().unwrap();
//! let rows = read_all(&mut cursor).unwrap();
//! assert_eq!(rows.values, vec![59.0, 119.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod error;
pub mod types;

/// Window boundary calculation for fixed and calendar windows
pub mod window;

/// Configuration management with TOML support
pub mod config;

/// Cursor factory dispatching on value type and aggregate kind
pub mod factory;

// Re-export main types
pub use config::CursorConfig;
pub use cursor::{read_all, ArrayBatch, CursorStats, PointCursor, TypedCursor};
pub use error::{Error, Result};
pub use factory::{new_aggregate_cursor, AggregateRequest};
pub use types::{AggregateKind, Timestamp, ValueType};
pub use window::{Bounds, Interval, Window, WindowSpec};
