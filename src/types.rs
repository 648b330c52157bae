//! Core data types shared by every cursor
//!
//! # Key Types
//!
//! - **`ValueType`**: The five point value types a series can hold
//! - **`AggregateKind`**: The reductions a cursor can compute
//! - **`PointValue`**: Trait tying a Rust type to its `ValueType`
//! - **`Numeric`**: Arithmetic needed by Sum, Mean, Min and Max
//!
//! # Example
//!
//! ```rust
//! use kuba_aggregate::types::{AggregateKind, ValueType};
//!
//! assert_eq!(AggregateKind::Count.output_type(ValueType::String).unwrap(), ValueType::Integer);
//! assert_eq!(AggregateKind::Mean.output_type(ValueType::Unsigned).unwrap(), ValueType::Float);
//! assert!(AggregateKind::Sum.output_type(ValueType::Boolean).is_err());
//! ```

use crate::cursor::{PointCursor, TypedCursor};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in nanoseconds since the Unix epoch
pub type Timestamp = i64;

/// Value type carried by a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// 64-bit IEEE float
    Float,
    /// Signed 64-bit integer
    Integer,
    /// Unsigned 64-bit integer
    Unsigned,
    /// UTF-8 string
    String,
    /// Boolean
    Boolean,
}

impl ValueType {
    /// Whether the type supports arithmetic aggregates
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Float | ValueType::Integer | ValueType::Unsigned
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Float => write!(f, "float"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Unsigned => write!(f, "unsigned"),
            ValueType::String => write!(f, "string"),
            ValueType::Boolean => write!(f, "boolean"),
        }
    }
}

/// Reduction applied to the points of a series or window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    /// Number of points
    Count,
    /// Arithmetic sum (integer sums wrap on overflow)
    Sum,
    /// Arithmetic mean as a float
    Mean,
    /// Smallest value, first occurrence wins ties
    Min,
    /// Largest value, first occurrence wins ties
    Max,
    /// Value of the earliest point
    First,
    /// Value of the latest point
    Last,
}

impl AggregateKind {
    /// All aggregate kinds, in declaration order
    pub const ALL: [AggregateKind; 7] = [
        AggregateKind::Count,
        AggregateKind::Sum,
        AggregateKind::Mean,
        AggregateKind::Min,
        AggregateKind::Max,
        AggregateKind::First,
        AggregateKind::Last,
    ];

    /// Whether this kind is defined for the given input type
    pub fn supports(&self, value_type: ValueType) -> bool {
        match self {
            AggregateKind::Count | AggregateKind::First | AggregateKind::Last => true,
            AggregateKind::Sum | AggregateKind::Mean | AggregateKind::Min | AggregateKind::Max => {
                value_type.is_numeric()
            },
        }
    }

    /// Output type produced for the given input type
    ///
    /// Count always yields integers and Mean always yields floats; every
    /// other kind preserves the input type.
    pub fn output_type(&self, value_type: ValueType) -> Result<ValueType> {
        if !self.supports(value_type) {
            return Err(Error::unsupported(*self, value_type));
        }
        Ok(match self {
            AggregateKind::Count => ValueType::Integer,
            AggregateKind::Mean => ValueType::Float,
            _ => value_type,
        })
    }
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateKind::Count => write!(f, "count"),
            AggregateKind::Sum => write!(f, "sum"),
            AggregateKind::Mean => write!(f, "mean"),
            AggregateKind::Min => write!(f, "min"),
            AggregateKind::Max => write!(f, "max"),
            AggregateKind::First => write!(f, "first"),
            AggregateKind::Last => write!(f, "last"),
        }
    }
}

// ============================================================================
// Value Traits
// ============================================================================

/// A Rust type that can be stored as a point value
///
/// Links the type to its `ValueType` tag and to the matching variant of
/// `TypedCursor`, so generic code can move between boxed cursors and the
/// type-erased form without a runtime tag on the hot path.
pub trait PointValue: Clone + fmt::Debug + PartialEq + Send + 'static {
    /// Tag for this type
    const VALUE_TYPE: ValueType;

    /// Bytes this value accounts for in scan statistics
    fn encoded_size(&self) -> usize;

    /// Wrap a boxed cursor of this type into a `TypedCursor`
    fn into_typed(cursor: Box<dyn PointCursor<Value = Self>>) -> TypedCursor;

    /// Unwrap a `TypedCursor` holding this type
    ///
    /// Returns the original cursor in `Err` when the variant does not match.
    fn from_typed(
        cursor: TypedCursor,
    ) -> std::result::Result<Box<dyn PointCursor<Value = Self>>, TypedCursor>;
}

/// Arithmetic and ordering used by Sum, Mean, Min and Max
pub trait Numeric: PointValue + Copy + PartialOrd {
    /// Additive identity
    fn zero() -> Self;

    /// Addition in the type's own domain
    ///
    /// Integer types wrap on overflow with two's-complement semantics.
    fn add(self, rhs: Self) -> Self;

    /// Widen to f64 for Mean
    fn as_f64(self) -> f64;
}

macro_rules! impl_point_value {
    ($ty:ty, $tag:ident, |$v:ident| $size:expr) => {
        impl PointValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::$tag;

            #[inline]
            fn encoded_size(&self) -> usize {
                let $v = self;
                $size
            }

            fn into_typed(cursor: Box<dyn PointCursor<Value = Self>>) -> TypedCursor {
                TypedCursor::$tag(cursor)
            }

            fn from_typed(
                cursor: TypedCursor,
            ) -> std::result::Result<Box<dyn PointCursor<Value = Self>>, TypedCursor> {
                match cursor {
                    TypedCursor::$tag(c) => Ok(c),
                    other => Err(other),
                }
            }
        }
    };
}

impl_point_value!(f64, Float, |_v| 8);
impl_point_value!(i64, Integer, |_v| 8);
impl_point_value!(u64, Unsigned, |_v| 8);
impl_point_value!(String, String, |s| s.len());
impl_point_value!(bool, Boolean, |_v| 1);

impl Numeric for f64 {
    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self
    }
}

impl Numeric for i64 {
    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Numeric for u64 {
    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }

    #[inline]
    fn as_f64(self) -> f64 {
        self as f64
    }
}
