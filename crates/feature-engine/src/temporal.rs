//! Cyclical Time Encoding

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Hours per day
const HOUR_PERIOD: f64 = 24.0;
/// Minutes per hour
const MINUTE_PERIOD: f64 = 60.0;

/// Hour and minute of a timestamp with their sine/cosine phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CyclicalTime {
    pub hour: u32,
    pub minute: u32,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub minute_sin: f64,
    pub minute_cos: f64,
}

impl CyclicalTime {
    /// Decompose a UTC timestamp
    pub fn from_timestamp(timestamp: &DateTime<Utc>) -> Self {
        let hour = timestamp.hour();
        let minute = timestamp.minute();
        let (hour_sin, hour_cos) = encode(hour as f64, HOUR_PERIOD);
        let (minute_sin, minute_cos) = encode(minute as f64, MINUTE_PERIOD);

        Self {
            hour,
            minute,
            hour_sin,
            hour_cos,
            minute_sin,
            minute_cos,
        }
    }
}

/// `(sin, cos)` of `2π·value/period`
fn encode(value: f64, period: f64) -> (f64, f64) {
    let phase = 2.0 * PI * value / period;
    (phase.sin(), phase.cos())
}
