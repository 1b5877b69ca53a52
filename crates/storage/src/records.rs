//! Persisted Record Types

use crate::StorageError;
use chrono::{DateTime, Utc};
use feature_engine::FeatureRecord;
use history_window::SensorReading;
use serde::{Deserialize, Serialize};
use thermal_correction::CorrectionReport;

/// Enriched sensor row: the raw reading plus its derived features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub sensor_id: String,
    #[serde(flatten)]
    pub reading: SensorReading,
    #[serde(flatten)]
    pub features: FeatureRecord,
    pub created_at: DateTime<Utc>,
}

impl SensorRecord {
    /// Flat JSON row, one column per field
    pub fn to_row(&self) -> Result<serde_json::Value, StorageError> {
        serde_json::to_value(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Outcome of the prediction and correction step for one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Assigned by the repository on insert
    pub id: i64,
    pub sensor_id: String,
    /// Timestamp of the reading the prediction belongs to
    pub timestamp: DateTime<Utc>,
    /// Present when the model produced a value
    pub correction: Option<CorrectionReport>,
    /// Present when the model could not be reached or answered garbage
    pub unavailable_reason: Option<String>,
    /// Anomaly alerts and advisory messages
    pub alerts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Whether the model produced a value
    pub fn is_available(&self) -> bool {
        self.correction.is_some()
    }
}
