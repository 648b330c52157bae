//! Window Boundary Calculator
//!
//! Maps a timestamp to the half-open window `[start, end)` that contains it.
//! Two families of windows are supported:
//!
//! - **Fixed**: `every`, `period` and `offset` in nanoseconds.
//!   `start = floor((ts - offset) / every) * every + offset`,
//!   `end = start + period`.
//! - **Calendar**: `every` and `period` in whole months. The timestamp is
//!   read in UTC, truncated to its month, and stepped back to the nearest
//!   window boundary; `end` is `start` advanced by `period` months using real
//!   month lengths (28 to 31 days, leap years included).
//!
//! Windows are numbered: window `i` starts at `i * every + offset`
//! (nanoseconds or months). Indexes increase with start time, which lets the
//! windowed cursor track open windows without comparing timestamps.
//!
//! `every == period` tiles the time line. `period > every` produces
//! overlapping windows and `period < every` leaves gaps that belong to no
//! window; `windows_containing` handles all three.
//!
//! # Example
//!
//! ```rust
//! use kuba_aggregate::window::{Interval, Window, WindowSpec};
//!
//! let hour = 3_600_000_000_000;
//! let window = Window::new(WindowSpec::tumbling(Interval::Nanos(hour))).unwrap();
//! let bounds = window.window_of(hour + 42);
//! assert_eq!((bounds.start, bounds.end), (hour, 2 * hour));
//! ```

use crate::error::{Error, Result};
use crate::types::Timestamp;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Length of a window step, period or offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Fixed length in nanoseconds
    Nanos(i64),
    /// Whole calendar months
    Months(i64),
}

impl Interval {
    /// Whole minutes
    pub fn minutes(n: i64) -> Self {
        Interval::Nanos(n.saturating_mul(60_000_000_000))
    }

    /// Whole hours
    pub fn hours(n: i64) -> Self {
        Interval::Nanos(n.saturating_mul(3_600_000_000_000))
    }

    /// Whole calendar months
    pub fn months(n: i64) -> Self {
        Interval::Months(n)
    }

    fn is_positive(&self) -> bool {
        match *self {
            Interval::Nanos(n) | Interval::Months(n) => n > 0,
        }
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::Nanos(0)
    }
}

impl From<Duration> for Interval {
    /// Durations beyond the i64 nanosecond range (~292 years) saturate
    fn from(duration: Duration) -> Self {
        Interval::Nanos(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }
}

/// Window specification as carried by an aggregate request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Distance between consecutive window starts
    pub every: Interval,

    /// Length of each window
    pub period: Interval,

    /// Phase shift of the window boundaries
    #[serde(default)]
    pub offset: Interval,
}

impl WindowSpec {
    /// Create non-overlapping windows (`period == every`)
    pub fn tumbling(every: Interval) -> Self {
        Self {
            every,
            period: every,
            offset: Interval::default(),
        }
    }

    /// Create windows starting every `every` and lasting `period`
    pub fn sliding(every: Interval, period: Interval) -> Self {
        Self {
            every,
            period,
            offset: Interval::default(),
        }
    }

    /// Set window alignment offset
    pub fn with_offset(mut self, offset: Interval) -> Self {
        self.offset = offset;
        self
    }
}

/// Half-open time interval `[start, end)`
///
/// An end of `i64::MAX` marks a window that runs past the last
/// representable instant, so it also covers `i64::MAX` itself. A window
/// whose start saturated to `i64::MAX` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    /// Inclusive start in nanoseconds
    pub start: Timestamp,
    /// Exclusive end in nanoseconds, unbounded at `i64::MAX`
    pub end: Timestamp,
}

impl Bounds {
    /// Check if timestamp falls in this window
    #[inline]
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.start
            && (timestamp < self.end || (self.end == Timestamp::MAX && self.start < self.end))
    }

    /// Check if the window closed before `timestamp`
    #[inline]
    pub fn ends_before(&self, timestamp: Timestamp) -> bool {
        timestamp >= self.end && !self.contains(timestamp)
    }
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Fixed {
        every: i64,
        period: i64,
        offset: i64,
    },
    Calendar {
        every: i64,
        period: i64,
        offset_months: i64,
        offset_nanos: i64,
    },
}

/// Validated window specification
#[derive(Debug, Clone, Copy)]
pub struct Window {
    spec: WindowSpec,
    layout: Layout,
}

impl Window {
    /// Validate a window specification
    ///
    /// `every` and `period` must be positive and share a unit. A month offset
    /// is only meaningful for calendar windows; a nanosecond offset is
    /// accepted for both.
    pub fn new(spec: WindowSpec) -> Result<Self> {
        if !spec.every.is_positive() {
            return Err(Error::invalid_window(format!(
                "every must be positive, got {:?}",
                spec.every
            )));
        }
        if !spec.period.is_positive() {
            return Err(Error::invalid_window(format!(
                "period must be positive, got {:?}",
                spec.period
            )));
        }

        let layout = match (spec.every, spec.period, spec.offset) {
            (Interval::Nanos(every), Interval::Nanos(period), Interval::Nanos(offset)) => {
                Layout::Fixed {
                    every,
                    period,
                    offset,
                }
            },
            (Interval::Nanos(_), Interval::Nanos(_), Interval::Months(_)) => {
                return Err(Error::invalid_window(
                    "month offset requires calendar every and period",
                ));
            },
            (Interval::Months(every), Interval::Months(period), offset) => {
                let (offset_months, offset_nanos) = match offset {
                    Interval::Months(m) => (m, 0),
                    Interval::Nanos(n) => (0, n),
                };
                Layout::Calendar {
                    every,
                    period,
                    offset_months,
                    offset_nanos,
                }
            },
            _ => {
                return Err(Error::invalid_window(
                    "every and period must both be fixed durations or both be months",
                ));
            },
        };

        Ok(Self { spec, layout })
    }

    /// The specification this window was built from
    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }

    /// Whether a timestamp can belong to more than one window
    pub fn is_overlapping(&self) -> bool {
        match self.layout {
            Layout::Fixed { every, period, .. } | Layout::Calendar { every, period, .. } => {
                period > every
            },
        }
    }

    /// Window bounds for the latest window starting at or before `timestamp`
    ///
    /// For tiling windows this is the window containing the timestamp. With
    /// gaps (`period < every`) the returned window may end at or before the
    /// timestamp; check with `Bounds::contains`.
    pub fn window_of(&self, timestamp: Timestamp) -> Bounds {
        let index = self
            .latest_containing(timestamp)
            .unwrap_or_else(|| self.index_of(timestamp));
        self.bounds_at(index)
    }

    /// Latest window index containing `timestamp`
    ///
    /// `index_of` can land on an empty window starting at `i64::MAX`; the
    /// window before it then covers the top of the range.
    fn latest_containing(&self, timestamp: Timestamp) -> Option<i64> {
        let latest = self.index_of(timestamp);
        if self.bounds_at(latest).contains(timestamp) {
            return Some(latest);
        }
        (latest > i64::MIN && self.bounds_at(latest - 1).contains(timestamp))
            .then(|| latest - 1)
    }

    /// Index of the latest window starting at or before `timestamp`
    pub fn index_of(&self, timestamp: Timestamp) -> i64 {
        match self.layout {
            Layout::Fixed { every, offset, .. } => {
                let relative = timestamp as i128 - offset as i128;
                clamp_i128(relative.div_euclid(every as i128))
            },
            Layout::Calendar {
                every,
                offset_months,
                offset_nanos,
                ..
            } => {
                let month = month_index(timestamp.saturating_sub(offset_nanos));
                month.saturating_sub(offset_months).div_euclid(every)
            },
        }
    }

    /// Bounds of window `index`
    pub fn bounds_at(&self, index: i64) -> Bounds {
        match self.layout {
            Layout::Fixed {
                every,
                period,
                offset,
            } => {
                let start = clamp_i128(index as i128 * every as i128 + offset as i128);
                Bounds {
                    start,
                    end: start.saturating_add(period),
                }
            },
            Layout::Calendar {
                every,
                period,
                offset_months,
                offset_nanos,
            } => {
                let first_month = index.saturating_mul(every).saturating_add(offset_months);
                Bounds {
                    start: month_start(first_month).saturating_add(offset_nanos),
                    end: month_start(first_month.saturating_add(period))
                        .saturating_add(offset_nanos),
                }
            },
        }
    }

    /// Index range of every window containing `timestamp`
    ///
    /// Returns `None` when the timestamp falls in a gap between windows.
    /// Otherwise the inclusive range is ordered by window start; it spans a
    /// single index unless windows overlap.
    pub fn indexes_containing(&self, timestamp: Timestamp) -> Option<(i64, i64)> {
        let latest = self.latest_containing(timestamp)?;

        if !self.is_overlapping() {
            return Some((latest, latest));
        }

        let earliest = match self.layout {
            Layout::Fixed {
                every,
                period,
                offset,
            } => {
                // Smallest i with i * every + offset + period > timestamp,
                // or >= at i64::MAX where the end saturates
                let top = i128::from(timestamp == Timestamp::MAX);
                let reach = timestamp as i128 - offset as i128 - period as i128 - top;
                clamp_i128(reach.div_euclid(every as i128) + 1)
            },
            Layout::Calendar { .. } => {
                let mut earliest = latest;
                while earliest > i64::MIN && self.bounds_at(earliest - 1).contains(timestamp) {
                    earliest -= 1;
                }
                earliest
            },
        };
        Some((earliest.min(latest), latest))
    }

    /// Bounds of every window containing `timestamp`, ordered by start
    pub fn windows_containing(&self, timestamp: Timestamp) -> Vec<Bounds> {
        match self.indexes_containing(timestamp) {
            Some((earliest, latest)) => (earliest..=latest).map(|i| self.bounds_at(i)).collect(),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Calendar Arithmetic
// ============================================================================

/// Months elapsed since January 1970 for a UTC timestamp
fn month_index(timestamp: Timestamp) -> i64 {
    let secs = timestamp.div_euclid(NANOS_PER_SECOND);
    let nanos = timestamp.rem_euclid(NANOS_PER_SECOND) as u32;
    // Every i64 nanosecond timestamp is within chrono's range
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|dt| (dt.year() as i64 - 1970) * 12 + dt.month0() as i64)
        .unwrap_or(0)
}

/// First nanosecond of month `index` (months since January 1970)
///
/// Months outside the representable range clamp to `i64::MIN` / `i64::MAX`.
fn month_start(index: i64) -> Timestamp {
    let year = 1970i64.saturating_add(index.div_euclid(12));
    let month = index.rem_euclid(12) as u32 + 1;

    i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month, 1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
        .unwrap_or(if index < 0 { i64::MIN } else { i64::MAX })
}

fn clamp_i128(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60_000_000_000;
    const HOUR: i64 = 60 * MINUTE;

    fn utc(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32, ns: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_nano_opt(h, mi, s, ns)
            .unwrap()
            .and_utc()
            .timestamp_nanos_opt()
            .unwrap()
    }

    fn monthly(every: i64) -> Window {
        Window::new(WindowSpec::tumbling(Interval::months(every))).unwrap()
    }

    #[test]
    fn test_fixed_alignment() {
        let window = Window::new(WindowSpec::tumbling(Interval::hours(1))).unwrap();
        assert_eq!(
            window.window_of(0),
            Bounds {
                start: 0,
                end: HOUR
            }
        );
        assert_eq!(window.window_of(HOUR - 1).start, 0);
        assert_eq!(window.window_of(HOUR).start, HOUR);
    }

    #[test]
    fn test_fixed_negative_timestamps_floor() {
        let window = Window::new(WindowSpec::tumbling(Interval::hours(1))).unwrap();
        let bounds = window.window_of(-1);
        assert_eq!(bounds.start, -HOUR);
        assert_eq!(bounds.end, 0);
    }

    #[test]
    fn test_fixed_offset() {
        let spec = WindowSpec::tumbling(Interval::hours(1)).with_offset(Interval::minutes(15));
        let window = Window::new(spec).unwrap();
        assert_eq!(window.window_of(10 * MINUTE).start, -45 * MINUTE);
        assert_eq!(window.window_of(15 * MINUTE).start, 15 * MINUTE);
        assert_eq!(window.window_of(74 * MINUTE).end, 75 * MINUTE);
    }

    #[test]
    fn test_fixed_offset_larger_than_every() {
        let spec = WindowSpec::tumbling(Interval::hours(1)).with_offset(Interval::minutes(75));
        let window = Window::new(spec).unwrap();
        assert_eq!(window.window_of(20 * MINUTE).start, 15 * MINUTE);
    }

    #[test]
    fn test_fixed_extremes_saturate() {
        let window = Window::new(WindowSpec::tumbling(Interval::hours(1))).unwrap();
        let top = window.window_of(i64::MAX);
        assert!(top.start <= i64::MAX && top.end == i64::MAX);
        assert!(top.contains(i64::MAX));
        let bottom = window.window_of(i64::MIN);
        assert_eq!(bottom.start, i64::MIN);
    }

    #[test]
    fn test_top_of_range_is_covered() {
        let hourly = Window::new(WindowSpec::tumbling(Interval::hours(1))).unwrap();
        let latest = i64::MAX / HOUR;
        assert_eq!(hourly.indexes_containing(i64::MAX), Some((latest, latest)));
        assert_eq!(hourly.window_of(i64::MAX - 10), hourly.window_of(i64::MAX));

        // The window starting at i64::MAX is empty; the one before covers it
        let nanos = Window::new(WindowSpec::tumbling(Interval::Nanos(1))).unwrap();
        assert!(!nanos.bounds_at(i64::MAX).contains(i64::MAX));
        assert_eq!(
            nanos.window_of(i64::MAX),
            Bounds {
                start: i64::MAX - 1,
                end: i64::MAX
            }
        );
        assert_eq!(nanos.indexes_containing(i64::MAX), Some((i64::MAX - 1, i64::MAX - 1)));

        let sliding =
            Window::new(WindowSpec::sliding(Interval::hours(1), Interval::hours(3))).unwrap();
        assert_eq!(sliding.indexes_containing(i64::MAX), Some((latest - 2, latest)));
        assert!(sliding.windows_containing(i64::MAX).iter().all(|b| b.contains(i64::MAX)));

        let top = monthly(1).window_of(i64::MAX);
        assert_eq!(top.start, utc(2262, 4, 1, 0, 0, 0, 0));
        assert_eq!(top.end, i64::MAX);
        assert!(top.contains(i64::MAX));

        let gaps = Window::new(WindowSpec::sliding(Interval::hours(2), Interval::hours(1))).unwrap();
        let last = gaps.window_of(i64::MAX);
        assert_eq!(gaps.indexes_containing(i64::MAX).is_some(), last.contains(i64::MAX));
    }

    #[test]
    fn test_gap_windows() {
        let spec = WindowSpec::sliding(Interval::hours(1), Interval::minutes(30));
        let window = Window::new(spec).unwrap();
        assert_eq!(window.indexes_containing(10 * MINUTE), Some((0, 0)));
        assert_eq!(window.indexes_containing(45 * MINUTE), None);
        assert!(window.windows_containing(45 * MINUTE).is_empty());
    }

    #[test]
    fn test_overlapping_windows() {
        let spec = WindowSpec::sliding(Interval::minutes(10), Interval::minutes(30));
        let window = Window::new(spec).unwrap();
        assert!(window.is_overlapping());

        let windows = window.windows_containing(25 * MINUTE);
        let starts: Vec<i64> = windows.iter().map(|b| b.start / MINUTE).collect();
        assert_eq!(starts, vec![0, 10, 20]);
        assert!(windows.iter().all(|b| b.contains(25 * MINUTE)));
    }

    #[test]
    fn test_calendar_month_boundary() {
        let window = monthly(1);
        let jan_end = utc(2024, 1, 31, 23, 59, 59, 999_999_999);
        let feb_start = utc(2024, 2, 1, 0, 0, 0, 0);

        let jan = window.window_of(jan_end);
        let feb = window.window_of(feb_start);
        assert_ne!(jan, feb);
        assert_eq!(jan.start, utc(2024, 1, 1, 0, 0, 0, 0));
        assert_eq!(jan.end, feb_start);
        assert_eq!(feb.start, feb_start);
    }

    #[test]
    fn test_calendar_leap_february() {
        let window = monthly(1);
        let feb = window.window_of(utc(2024, 2, 29, 12, 0, 0, 0));
        assert_eq!(feb.end - feb.start, 29 * 24 * HOUR);
        let feb = window.window_of(utc(2023, 2, 10, 0, 0, 0, 0));
        assert_eq!(feb.end - feb.start, 28 * 24 * HOUR);
    }

    #[test]
    fn test_calendar_year_rollover() {
        let window = monthly(1);
        let dec = window.window_of(utc(2023, 12, 31, 23, 0, 0, 0));
        assert_eq!(dec.start, utc(2023, 12, 1, 0, 0, 0, 0));
        assert_eq!(dec.end, utc(2024, 1, 1, 0, 0, 0, 0));
        assert_eq!(window.window_of(dec.end).start, dec.end);
    }

    #[test]
    fn test_calendar_quarters() {
        let window = monthly(3);
        let q = window.window_of(utc(2024, 5, 20, 0, 0, 0, 0));
        assert_eq!(q.start, utc(2024, 4, 1, 0, 0, 0, 0));
        assert_eq!(q.end, utc(2024, 7, 1, 0, 0, 0, 0));

        let q4 = window.window_of(utc(2023, 11, 5, 0, 0, 0, 0));
        assert_eq!(q4.end, utc(2024, 1, 1, 0, 0, 0, 0));
    }

    #[test]
    fn test_calendar_month_offset() {
        let spec = WindowSpec::tumbling(Interval::months(3)).with_offset(Interval::months(1));
        let window = Window::new(spec).unwrap();
        let q = window.window_of(utc(2024, 1, 15, 0, 0, 0, 0));
        assert_eq!(q.start, utc(2023, 11, 1, 0, 0, 0, 0));
        assert_eq!(q.end, utc(2024, 2, 1, 0, 0, 0, 0));
    }

    #[test]
    fn test_calendar_nanosecond_offset() {
        let spec = WindowSpec::tumbling(Interval::months(1)).with_offset(Interval::hours(6));
        let window = Window::new(spec).unwrap();
        let before = window.window_of(utc(2024, 3, 1, 5, 0, 0, 0));
        assert_eq!(before.start, utc(2024, 2, 1, 6, 0, 0, 0));
        assert_eq!(before.end, utc(2024, 3, 1, 6, 0, 0, 0));
    }

    #[test]
    fn test_calendar_before_epoch() {
        let window = monthly(1);
        let bounds = window.window_of(utc(1969, 12, 15, 0, 0, 0, 0));
        assert_eq!(bounds.start, utc(1969, 12, 1, 0, 0, 0, 0));
        assert_eq!(bounds.end, 0);
    }

    #[test]
    fn test_calendar_overlapping() {
        let spec = WindowSpec::sliding(Interval::months(1), Interval::months(2));
        let window = Window::new(spec).unwrap();
        let windows = window.windows_containing(utc(2024, 3, 10, 0, 0, 0, 0));
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].start, utc(2024, 2, 1, 0, 0, 0, 0));
        assert_eq!(windows[1].start, utc(2024, 3, 1, 0, 0, 0, 0));
    }

    #[test]
    fn test_invalid_specs() {
        assert!(Window::new(WindowSpec::tumbling(Interval::Nanos(0))).is_err());
        assert!(Window::new(WindowSpec::tumbling(Interval::Months(-1))).is_err());
        assert!(Window::new(WindowSpec::sliding(Interval::hours(1), Interval::months(1))).is_err());
        let spec = WindowSpec::tumbling(Interval::hours(1)).with_offset(Interval::months(1));
        assert!(matches!(Window::new(spec), Err(Error::InvalidWindow(_))));
    }

    #[test]
    fn test_interval_from_duration_saturates() {
        assert_eq!(
            Interval::from(Duration::from_secs(1)),
            Interval::Nanos(1_000_000_000)
        );
        assert_eq!(
            Interval::from(Duration::from_secs(u64::MAX)),
            Interval::Nanos(i64::MAX)
        );
    }

    #[test]
    fn test_spec_serde() {
        let spec = WindowSpec::tumbling(Interval::months(1));
        let json = serde_json::to_string(&spec).unwrap();
        let back: WindowSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);

        let parsed: WindowSpec =
            serde_json::from_str(r#"{"every":{"nanos":60},"period":{"nanos":120}}"#).unwrap();
        assert_eq!(parsed.offset, Interval::Nanos(0));
    }
}
