//! Validation Error Types

use thiserror::Error;

/// Errors during reading validation
///
/// Every variant is an invalid-input condition and is surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Required field absent from the payload
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Numeric field is NaN or infinite
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// Timestamp could not be parsed to an instant
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// Payload is not a valid reading object
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}
