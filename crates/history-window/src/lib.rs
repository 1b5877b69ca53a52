//! Per-Sensor History Window
//!
//! Keeps the most recent kiln readings for each sensor stream so that lag and
//! rolling features can be derived from the readings that came before.

mod store;
mod window;

pub use store::WindowStore;
pub use window::{HistoryWindow, WINDOW_CAPACITY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default alternative-fuel calorific value (kcal/kg)
pub const DEFAULT_AF_CALORIFIC: f64 = 4000.0;
/// Default coal calorific value (kcal/kg)
pub const DEFAULT_COAL_CALORIFIC: f64 = 6000.0;

/// Errors raised by the history window
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    /// Reading does not come strictly after the newest entry
    #[error("Out-of-order reading for {sensor_id}: {timestamp} is not after {latest}")]
    OutOfOrder {
        sensor_id: String,
        timestamp: DateTime<Utc>,
        latest: DateTime<Utc>,
    },

    /// Window lock was poisoned by a panicking holder
    #[error("Window lock poisoned for {0}")]
    LockPoisoned(String),

    /// Checkpoint could not be encoded or decoded
    #[error("Checkpoint codec error: {0}")]
    Codec(String),
}

/// One timestamped kiln observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub timestamp: DateTime<Utc>,
    pub kiln_temp: f64,
    pub motor_load: f64,
    pub feeder_rate: f64,
    pub emissions: f64,
    pub vibration: f64,
    pub pressure: f64,
    pub fuel_rate: f64,
    pub raw_feed: f64,
    pub grinding_power: f64,
    /// Alternative fuel share of the feed (%)
    #[serde(default)]
    pub af_share_pct: f64,
    #[serde(default = "default_af_calorific")]
    pub af_calorific: f64,
    #[serde(default = "default_coal_calorific")]
    pub coal_calorific: f64,
}

fn default_af_calorific() -> f64 {
    DEFAULT_AF_CALORIFIC
}

fn default_coal_calorific() -> f64 {
    DEFAULT_COAL_CALORIFIC
}

impl SensorReading {
    /// Every numeric field paired with its wire name
    pub fn numeric_fields(&self) -> [(&'static str, f64); 12] {
        [
            ("kiln_temp", self.kiln_temp),
            ("motor_load", self.motor_load),
            ("feeder_rate", self.feeder_rate),
            ("emissions", self.emissions),
            ("vibration", self.vibration),
            ("pressure", self.pressure),
            ("fuel_rate", self.fuel_rate),
            ("raw_feed", self.raw_feed),
            ("grinding_power", self.grinding_power),
            ("af_share_pct", self.af_share_pct),
            ("af_calorific", self.af_calorific),
            ("coal_calorific", self.coal_calorific),
        ]
    }

    /// First numeric field that is NaN or infinite, if any
    pub fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        self.numeric_fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite())
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self {
            timestamp: DateTime::<Utc>::default(),
            kiln_temp: 0.0,
            motor_load: 0.0,
            feeder_rate: 0.0,
            emissions: 0.0,
            vibration: 0.0,
            pressure: 0.0,
            fuel_rate: 0.0,
            raw_feed: 0.0,
            grinding_power: 0.0,
            af_share_pct: 0.0,
            af_calorific: DEFAULT_AF_CALORIFIC,
            coal_calorific: DEFAULT_COAL_CALORIFIC,
        }
    }
}
