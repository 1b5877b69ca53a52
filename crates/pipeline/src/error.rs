//! Pipeline Errors

use data_validator::ValidationError;
use feature_engine::FeatureError;
use history_window::HistoryError;
use storage::StorageError;
use thermal_correction::ThermalError;
use thiserror::Error;

/// Errors that reject a reading or stop the pipeline from starting
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Thermal(#[from] ThermalError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl PipelineError {
    /// Whether the reading itself was bad, as opposed to out of order or a
    /// pipeline fault
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PipelineError::Validation(_) | PipelineError::Feature(_) | PipelineError::Thermal(_)
        )
    }
}
