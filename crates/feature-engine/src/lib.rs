//! Feature Engineering Engine
//!
//! Derives the kiln model's feature record from a reading and its prior
//! history, and flattens it into the fixed-order model input vector.

mod features;
mod statistics;
mod temporal;
mod vector;

pub use features::{FeatureDeriver, FeatureRecord, EPSILON, LAG_COUNT, ROLLING_WINDOWS};
pub use statistics::{lag_values, rolling_mean};
pub use temporal::CyclicalTime;
pub use vector::{FeatureVector, FEATURE_DIMENSION, FEATURE_NAMES};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors during feature derivation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Numeric input is NaN or infinite
    #[error("Invalid input: {field} must be finite, got {value}")]
    InvalidInput { field: &'static str, value: f64 },

    /// History is not strictly older than the reading, or not in time order
    #[error("History is out of order: {earlier} is not before {later}")]
    UnorderedHistory {
        earlier: DateTime<Utc>,
        later: DateTime<Utc>,
    },
}
