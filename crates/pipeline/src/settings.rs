//! Pipeline Configuration

use crate::PipelineError;
use advisory::AnomalyThresholds;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thermal_correction::DEFAULT_DEG_PER_PCT;
use tracing::info;

/// Prefix for environment overrides, e.g. `KILN__THERMAL__DEG_PER_PCT=2.5`
const ENV_PREFIX: &str = "KILN";

/// Thermal correction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    /// Temperature drop per percentage point of lost heat input (°C)
    pub deg_per_pct: f64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            deg_per_pct: DEFAULT_DEG_PER_PCT,
        }
    }
}

/// Offline predictor settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Constant offset added by the mock predictor (°C)
    pub mock_bias: f64,
}

/// In-memory record retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub max_sensor_records: usize,
    pub max_prediction_records: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_sensor_records: 100_000,
            max_prediction_records: 10_000,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Sensor id used when a reading carries none
    pub default_sensor_id: String,
    pub thermal: ThermalConfig,
    pub predictor: PredictorConfig,
    pub anomaly: AnomalyThresholds,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_sensor_id: "kiln-1".to_string(),
            thermal: ThermalConfig::default(),
            predictor: PredictorConfig::default(),
            anomaly: AnomalyThresholds::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration
    ///
    /// Sources (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. The TOML file at `path`, when given
    /// 3. Environment variables with `KILN__` prefix
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        Self::finish(builder)
    }

    /// Load configuration from TOML text, still honouring the environment
    pub fn from_toml(text: &str) -> Result<Self, PipelineError> {
        Self::finish(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, PipelineError> {
        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.thermal.deg_per_pct.is_finite() || self.thermal.deg_per_pct < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "thermal.deg_per_pct must be a non-negative number, got {}",
                self.thermal.deg_per_pct
            )));
        }
        if !self.predictor.mock_bias.is_finite() {
            return Err(PipelineError::InvalidConfig(
                "predictor.mock_bias must be finite".to_string(),
            ));
        }
        if self.storage.max_sensor_records == 0 || self.storage.max_prediction_records == 0 {
            return Err(PipelineError::InvalidConfig(
                "storage retention must be at least one record".to_string(),
            ));
        }
        if self.default_sensor_id.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "default_sensor_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
