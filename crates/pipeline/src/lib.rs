//! Kiln Telemetry Pipeline
//!
//! Wires validation, per-sensor history, feature derivation, model inference,
//! thermal correction, advisories and record sinks into one processing step.

mod settings;
mod error;
mod logging;
mod service;

pub use settings::{LoggingConfig, PipelineConfig, PredictorConfig, StorageConfig, ThermalConfig};
pub use error::PipelineError;
pub use logging::init_logging;
pub use service::{
    KilnPipeline, Outcome, PipelineBuilder, Prediction, ReplayFailure, ReplayReport,
};
