//! Bounded History Window

use crate::{HistoryError, SensorReading};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::trace;

/// Number of prior readings kept per sensor (enough for `rolling_10`)
pub const WINDOW_CAPACITY: usize = 10;

/// Most recent readings for one sensor stream, oldest first
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    /// Sensor identity this window belongs to
    sensor_id: String,
    /// Retained readings (oldest at the front)
    entries: VecDeque<SensorReading>,
    /// Total readings appended over the window's lifetime
    total_appended: usize,
}

/// Serialized form of a window
#[derive(Serialize, Deserialize)]
struct Checkpoint {
    sensor_id: String,
    total_appended: usize,
    entries: Vec<SensorReading>,
}

impl HistoryWindow {
    /// Create an empty window for a sensor stream
    pub fn new(sensor_id: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            entries: VecDeque::with_capacity(WINDOW_CAPACITY + 1),
            total_appended: 0,
        }
    }

    /// Sensor identity
    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    /// Copy of the retained readings, oldest to newest
    pub fn snapshot(&self) -> Vec<SensorReading> {
        self.entries.iter().cloned().collect()
    }

    /// Check that `reading` may be appended after the newest entry
    pub fn admits(&self, reading: &SensorReading) -> Result<(), HistoryError> {
        match self.entries.back() {
            Some(latest) if reading.timestamp <= latest.timestamp => {
                Err(HistoryError::OutOfOrder {
                    sensor_id: self.sensor_id.clone(),
                    timestamp: reading.timestamp,
                    latest: latest.timestamp,
                })
            }
            _ => Ok(()),
        }
    }

    /// Append a reading, evicting the oldest entry on overflow
    ///
    /// Must only be called after the reading's own features were derived from
    /// [`snapshot`](Self::snapshot).
    pub fn append(&mut self, reading: SensorReading) -> Result<(), HistoryError> {
        self.admits(&reading)?;

        self.entries.push_back(reading);
        while self.entries.len() > WINDOW_CAPACITY {
            self.entries.pop_front();
        }
        self.total_appended += 1;

        trace!(
            sensor_id = %self.sensor_id,
            len = self.entries.len(),
            "Appended reading to history window"
        );
        Ok(())
    }

    /// Number of retained readings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest retained reading
    pub fn latest(&self) -> Option<&SensorReading> {
        self.entries.back()
    }

    /// Total readings appended (including evicted ones)
    pub fn total_appended(&self) -> usize {
        self.total_appended
    }

    /// Encode the window into a compact checkpoint
    pub fn to_bytes(&self) -> Result<Vec<u8>, HistoryError> {
        let checkpoint = Checkpoint {
            sensor_id: self.sensor_id.clone(),
            total_appended: self.total_appended,
            entries: self.snapshot(),
        };
        postcard::to_allocvec(&checkpoint).map_err(|e| HistoryError::Codec(e.to_string()))
    }

    /// Restore a window from a checkpoint produced by [`to_bytes`](Self::to_bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HistoryError> {
        let checkpoint: Checkpoint =
            postcard::from_bytes(bytes).map_err(|e| HistoryError::Codec(e.to_string()))?;

        if checkpoint.entries.len() > WINDOW_CAPACITY {
            return Err(HistoryError::Codec(format!(
                "checkpoint holds {} readings, capacity is {}",
                checkpoint.entries.len(),
                WINDOW_CAPACITY
            )));
        }

        // Re-append so the ordering invariant is enforced on restore
        let mut window = Self::new(checkpoint.sensor_id);
        for reading in checkpoint.entries {
            window
                .append(reading)
                .map_err(|e| HistoryError::Codec(e.to_string()))?;
        }
        window.total_appended = checkpoint.total_appended.max(window.len());
        Ok(window)
    }
}
