//! Aggregate Cursor Factory
//!
//! Single runtime dispatch point of the engine: given a type-erased input
//! cursor and an aggregate request, pick the monomorphized cursor for the
//! (value type, aggregate kind, windowed) combination and hand it back type
//! erased. Everything downstream of this function is statically typed.

use crate::config::CursorConfig;
use crate::cursor::reducer::{
    CountReducer, FirstReducer, LastReducer, MaxReducer, MeanReducer, MinReducer, Reducer,
    SumReducer,
};
use crate::cursor::{PointCursor, SeriesAggregateCursor, TypedCursor, WindowAggregateCursor};
use crate::error::{Error, Result};
use crate::types::{AggregateKind, Numeric, PointValue, ValueType};
use crate::window::{Window, WindowSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Aggregate request as produced by the query planner
///
/// # Example
///
/// ```rust
/// use kuba_aggregate::{AggregateKind, AggregateRequest};
///
/// let request: AggregateRequest =
///     serde_json::from_str(r#"{"kind":"mean","window":{"every":{"nanos":60000000000},"period":{"nanos":60000000000}}}"#)
///         .unwrap();
/// assert_eq!(request.kind, AggregateKind::Mean);
/// assert!(request.window.is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Reduction to apply
    pub kind: AggregateKind,

    /// Time windows to reduce over; the whole series when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowSpec>,
}

impl AggregateRequest {
    /// Reduce the whole series to one row
    pub fn new(kind: AggregateKind) -> Self {
        Self { kind, window: None }
    }

    /// Reduce each window to one row
    pub fn windowed(kind: AggregateKind, window: WindowSpec) -> Self {
        Self {
            kind,
            window: Some(window),
        }
    }

    /// Output value type for an input of `value_type`
    pub fn output_type(&self, value_type: ValueType) -> Result<ValueType> {
        self.kind.output_type(value_type)
    }
}

/// Wrap `input` in the aggregate cursor described by `request`
///
/// Fails with `UnsupportedAggregate` when the kind is not defined for the
/// input's value type, `InvalidWindow` for a rejected window specification
/// and `Configuration` for an invalid config. On failure the input cursor is
/// closed before returning, since ownership has already been transferred.
pub fn new_aggregate_cursor(
    mut input: TypedCursor,
    request: &AggregateRequest,
    config: &CursorConfig,
) -> Result<TypedCursor> {
    let value_type = input.value_type();
    let window = match prepare(value_type, request, config) {
        Ok(window) => window,
        Err(e) => {
            debug!(kind = %request.kind, value_type = %value_type, error = %e, "Rejected aggregate request");
            input.close();
            return Err(e);
        },
    };

    debug!(
        kind = %request.kind,
        value_type = %value_type,
        windowed = window.is_some(),
        max_points_per_block = config.max_points_per_block,
        "Creating aggregate cursor"
    );

    let max_points = config.max_points_per_block;
    match input {
        TypedCursor::Float(c) => Ok(numeric(c, request.kind, window, max_points)),
        TypedCursor::Integer(c) => Ok(numeric(c, request.kind, window, max_points)),
        TypedCursor::Unsigned(c) => Ok(numeric(c, request.kind, window, max_points)),
        TypedCursor::String(c) => any_value(c, request.kind, window, max_points),
        TypedCursor::Boolean(c) => any_value(c, request.kind, window, max_points),
    }
}

fn prepare(
    value_type: ValueType,
    request: &AggregateRequest,
    config: &CursorConfig,
) -> Result<Option<Window>> {
    config.validate()?;
    request.output_type(value_type)?;
    request.window.map(Window::new).transpose()
}

fn build<T, R>(
    input: Box<dyn PointCursor<Value = T>>,
    window: Option<Window>,
    max_points: usize,
) -> TypedCursor
where
    T: PointValue,
    R: Reducer<T> + 'static,
{
    match window {
        Some(window) => TypedCursor::new(WindowAggregateCursor::<_, R>::new(
            input, window, max_points,
        )),
        None => TypedCursor::new(SeriesAggregateCursor::<_, R>::new(input)),
    }
}

fn numeric<T: Numeric>(
    input: Box<dyn PointCursor<Value = T>>,
    kind: AggregateKind,
    window: Option<Window>,
    max_points: usize,
) -> TypedCursor {
    match kind {
        AggregateKind::Count => build::<T, CountReducer>(input, window, max_points),
        AggregateKind::Sum => build::<T, SumReducer<T>>(input, window, max_points),
        AggregateKind::Mean => build::<T, MeanReducer<T>>(input, window, max_points),
        AggregateKind::Min => build::<T, MinReducer<T>>(input, window, max_points),
        AggregateKind::Max => build::<T, MaxReducer<T>>(input, window, max_points),
        AggregateKind::First => build::<T, FirstReducer<T>>(input, window, max_points),
        AggregateKind::Last => build::<T, LastReducer<T>>(input, window, max_points),
    }
}

fn any_value<T: PointValue>(
    mut input: Box<dyn PointCursor<Value = T>>,
    kind: AggregateKind,
    window: Option<Window>,
    max_points: usize,
) -> Result<TypedCursor> {
    match kind {
        AggregateKind::Count => Ok(build::<T, CountReducer>(input, window, max_points)),
        AggregateKind::First => Ok(build::<T, FirstReducer<T>>(input, window, max_points)),
        AggregateKind::Last => Ok(build::<T, LastReducer<T>>(input, window, max_points)),
        AggregateKind::Sum | AggregateKind::Mean | AggregateKind::Min | AggregateKind::Max => {
            input.close();
            Err(Error::unsupported(kind, T::VALUE_TYPE))
        },
    }
}
