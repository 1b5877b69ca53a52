//! Threshold Anomaly Alerts

use history_window::SensorReading;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Alert thresholds; a reading strictly above a limit raises the alert
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyThresholds {
    /// Kiln temperature limit (°C)
    pub kiln_temp: f64,
    /// Motor load limit (%)
    pub motor_load: f64,
    /// Emissions limit (ppm)
    pub emissions: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            kiln_temp: 1200.0,
            motor_load: 90.0,
            emissions: 400.0,
        }
    }
}

/// Alert raised by a single reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    HighKilnTemperature,
    MotorOverload,
    HighEmissions,
}

impl Alert {
    /// Operator-facing message
    pub fn message(&self) -> &'static str {
        match self {
            Alert::HighKilnTemperature => "High kiln temperature",
            Alert::MotorOverload => "Motor overload",
            Alert::HighEmissions => "High emissions",
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Check a reading against the thresholds
pub fn detect(reading: &SensorReading, thresholds: &AnomalyThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if reading.kiln_temp > thresholds.kiln_temp {
        alerts.push(Alert::HighKilnTemperature);
    }
    if reading.motor_load > thresholds.motor_load {
        alerts.push(Alert::MotorOverload);
    }
    if reading.emissions > thresholds.emissions {
        alerts.push(Alert::HighEmissions);
    }

    if !alerts.is_empty() {
        debug!(count = alerts.len(), "Anomalies detected");
    }
    alerts
}
