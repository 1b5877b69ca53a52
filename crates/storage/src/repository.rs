//! Repository Implementation

use crate::records::{PredictionRecord, SensorRecord};
use crate::StorageError;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::{debug, info};

/// Sink for pipeline records
///
/// The pipeline calls these but never depends on them for its results.
pub trait RecordSink: Send + Sync {
    /// Store an enriched sensor row
    fn save_sensor(&self, record: &SensorRecord) -> Result<(), StorageError>;

    /// Store a prediction outcome, returning its assigned id
    fn save_prediction(&self, record: PredictionRecord) -> Result<i64, StorageError>;
}

/// Prediction history plus the latest outcome per sensor
struct PredictionLog {
    history: VecDeque<PredictionRecord>,
    latest: HashMap<String, PredictionRecord>,
    next_id: i64,
}

/// Repository for data access (in-memory implementation)
pub struct Repository {
    /// Sensor records
    sensor_log: Mutex<VecDeque<SensorRecord>>,
    /// Prediction records
    predictions: Mutex<PredictionLog>,
    /// Max sensor records
    max_sensor_records: usize,
    /// Max prediction records
    max_prediction_records: usize,
}

fn lock_error<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::LockPoisoned(e.to_string())
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::with_retention(100_000, 10_000)
    }

    /// Create a repository with explicit retention limits
    pub fn with_retention(max_sensor_records: usize, max_prediction_records: usize) -> Self {
        info!(
            max_sensor_records,
            max_prediction_records, "Creating in-memory repository"
        );
        Self {
            sensor_log: Mutex::new(VecDeque::with_capacity(max_sensor_records.min(10_000))),
            predictions: Mutex::new(PredictionLog {
                history: VecDeque::with_capacity(max_prediction_records.min(1_000)),
                latest: HashMap::new(),
                next_id: 1,
            }),
            max_sensor_records: max_sensor_records.max(1),
            max_prediction_records: max_prediction_records.max(1),
        }
    }

    /// Get recent sensor records, newest first
    pub fn get_sensors(&self, limit: usize) -> Result<Vec<SensorRecord>, StorageError> {
        let log = self.sensor_log.lock().map_err(lock_error)?;
        Ok(log.iter().rev().take(limit).cloned().collect())
    }

    /// Get recent sensor records for one sensor, newest first
    pub fn get_sensors_for(
        &self,
        sensor_id: &str,
        limit: usize,
    ) -> Result<Vec<SensorRecord>, StorageError> {
        let log = self.sensor_log.lock().map_err(lock_error)?;
        Ok(log
            .iter()
            .rev()
            .filter(|r| r.sensor_id == sensor_id)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Get predictions, newest first, optionally for one sensor
    pub fn get_predictions(
        &self,
        sensor_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let predictions = self.predictions.lock().map_err(lock_error)?;
        Ok(predictions
            .history
            .iter()
            .rev()
            .filter(|p| sensor_id.map_or(true, |s| p.sensor_id == s))
            .take(limit)
            .cloned()
            .collect())
    }

    /// Latest prediction for a sensor
    pub fn latest_prediction(&self, sensor_id: &str) -> Result<PredictionRecord, StorageError> {
        let predictions = self.predictions.lock().map_err(lock_error)?;
        predictions
            .latest
            .get(sensor_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(sensor_id.to_string()))
    }

    /// Export the sensor log as JSON lines, oldest first
    pub fn export_sensor_rows(&self) -> Result<String, StorageError> {
        let log = self.sensor_log.lock().map_err(lock_error)?;
        let mut out = String::new();
        for record in log.iter() {
            out.push_str(&record.to_row()?.to_string());
            out.push('\n');
        }
        Ok(out)
    }

    /// Get total sensor count
    pub fn sensor_count(&self) -> usize {
        self.sensor_log.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Get total prediction count
    pub fn prediction_count(&self) -> usize {
        self.predictions.lock().map(|p| p.history.len()).unwrap_or(0)
    }

    /// Clear all data
    pub fn clear(&self) {
        if let Ok(mut log) = self.sensor_log.lock() {
            log.clear();
        }
        if let Ok(mut preds) = self.predictions.lock() {
            preds.history.clear();
            preds.latest.clear();
        }
    }
}

impl RecordSink for Repository {
    fn save_sensor(&self, record: &SensorRecord) -> Result<(), StorageError> {
        let mut log = self.sensor_log.lock().map_err(lock_error)?;

        // Enforce retention
        while log.len() >= self.max_sensor_records {
            log.pop_front();
        }

        log.push_back(record.clone());
        Ok(())
    }

    fn save_prediction(&self, mut record: PredictionRecord) -> Result<i64, StorageError> {
        let mut predictions = self.predictions.lock().map_err(lock_error)?;

        record.id = predictions.next_id;
        predictions.next_id += 1;

        while predictions.history.len() >= self.max_prediction_records {
            predictions.history.pop_front();
        }

        let id = record.id;
        predictions
            .latest
            .insert(record.sensor_id.clone(), record.clone());
        predictions.history.push_back(record);
        debug!("Inserted prediction with ID {}", id);

        Ok(id)
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}
