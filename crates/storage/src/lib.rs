//! Storage Layer
//!
//! Record sinks for enriched sensor rows and correction results, with an
//! in-memory repository implementation.

mod records;
mod repository;

pub use records::{PredictionRecord, SensorRecord};
pub use repository::{RecordSink, Repository};

use thiserror::Error;

/// Errors raised by record sinks
#[derive(Debug, Error)]
pub enum StorageError {
    /// The sink's backend refused the write
    #[error("Sink backend error: {0}")]
    Backend(String),

    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("No prediction recorded for sensor {0}")]
    NotFound(String),

    #[error("Failed to encode record: {0}")]
    Serialization(String),
}
