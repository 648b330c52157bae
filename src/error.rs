//! Error types for the aggregate cursor engine

use crate::types::{AggregateKind, ValueType};
use thiserror::Error;

/// Main error type for cursor construction and execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The aggregate kind is not defined for the input value type
    ///
    /// Raised by the cursor factory before any cursor is produced.
    #[error("Unsupported aggregate: {kind} is not defined for {value_type} values")]
    UnsupportedAggregate {
        /// Requested aggregate kind
        kind: AggregateKind,
        /// Value type of the input cursor
        value_type: ValueType,
    },

    /// Failure reported by the storage read path through a point cursor
    #[error("Storage error: {0}")]
    Storage(String),

    /// Window specification rejected during validation
    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Create an unsupported aggregate error
    pub fn unsupported(kind: AggregateKind, value_type: ValueType) -> Self {
        Error::UnsupportedAggregate { kind, value_type }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }

    /// Create an invalid window error
    pub fn invalid_window(message: impl Into<String>) -> Self {
        Error::InvalidWindow(message.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let err = Error::unsupported(AggregateKind::Mean, ValueType::String);
        let display = err.to_string();
        assert!(display.contains("mean"));
        assert!(display.contains("string"));
    }

    #[test]
    fn test_storage_display() {
        let err = Error::storage("chunk 42 truncated");
        assert_eq!(err.to_string(), "Storage error: chunk 42 truncated");
    }

    #[test]
    fn test_errors_are_comparable() {
        let a = Error::storage("boom");
        assert_eq!(a.clone(), Error::Storage("boom".to_string()));
        assert_ne!(a, Error::invalid_window("boom"));
    }
}
