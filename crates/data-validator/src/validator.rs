//! Reading Validator

use crate::error::ValidationError;
use chrono::{DateTime, NaiveDateTime, Utc};
use history_window::{SensorReading, DEFAULT_AF_CALORIFIC, DEFAULT_COAL_CALORIFIC};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Naive date-time layouts accepted when no UTC offset is given
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Reading as received from the ingestion boundary
///
/// Every field is optional here; [`Validator::validate`] decides which are
/// required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReading {
    pub sensor_id: Option<String>,
    pub timestamp: Option<String>,
    pub kiln_temp: Option<f64>,
    pub motor_load: Option<f64>,
    pub feeder_rate: Option<f64>,
    pub emissions: Option<f64>,
    pub vibration: Option<f64>,
    pub pressure: Option<f64>,
    pub fuel_rate: Option<f64>,
    pub raw_feed: Option<f64>,
    pub grinding_power: Option<f64>,
    pub af_share_pct: Option<f64>,
    pub af_calorific: Option<f64>,
    pub coal_calorific: Option<f64>,
}

impl From<&SensorReading> for RawReading {
    fn from(reading: &SensorReading) -> Self {
        Self {
            sensor_id: None,
            timestamp: Some(reading.timestamp.to_rfc3339()),
            kiln_temp: Some(reading.kiln_temp),
            motor_load: Some(reading.motor_load),
            feeder_rate: Some(reading.feeder_rate),
            emissions: Some(reading.emissions),
            vibration: Some(reading.vibration),
            pressure: Some(reading.pressure),
            fuel_rate: Some(reading.fuel_rate),
            raw_feed: Some(reading.raw_feed),
            grinding_power: Some(reading.grinding_power),
            af_share_pct: Some(reading.af_share_pct),
            af_calorific: Some(reading.af_calorific),
            coal_calorific: Some(reading.coal_calorific),
        }
    }
}

/// Parse an ISO-8601 timestamp into a UTC instant
///
/// Offsets are honoured; naive date-times are taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, ValidationError> {
    let text = text.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidTimestamp(text.to_string()))
}

/// Validator for raw kiln readings
#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Decode a JSON payload without validating it
    pub fn parse_json(&self, payload: &str) -> Result<RawReading, ValidationError> {
        serde_json::from_str(payload).map_err(|e| ValidationError::InvalidFormat(e.to_string()))
    }

    /// Decode and validate a JSON payload
    pub fn validate_json(&self, payload: &str) -> Result<(Option<String>, SensorReading), ValidationError> {
        let raw = self.parse_json(payload)?;
        let reading = self.validate(&raw)?;
        Ok((raw.sensor_id, reading))
    }

    /// Validate a raw reading
    pub fn validate(&self, raw: &RawReading) -> Result<SensorReading, ValidationError> {
        let timestamp = raw
            .timestamp
            .as_deref()
            .ok_or(ValidationError::MissingField("timestamp"))
            .and_then(parse_timestamp)?;

        let reading = SensorReading {
            timestamp,
            kiln_temp: self.require("kiln_temp", raw.kiln_temp)?,
            motor_load: self.require("motor_load", raw.motor_load)?,
            feeder_rate: self.require("feeder_rate", raw.feeder_rate)?,
            emissions: self.require("emissions", raw.emissions)?,
            vibration: self.require("vibration", raw.vibration)?,
            pressure: self.require("pressure", raw.pressure)?,
            fuel_rate: self.require("fuel_rate", raw.fuel_rate)?,
            raw_feed: self.require("raw_feed", raw.raw_feed)?,
            grinding_power: self.require("grinding_power", raw.grinding_power)?,
            af_share_pct: self.optional("af_share_pct", raw.af_share_pct, 0.0)?,
            af_calorific: self.optional("af_calorific", raw.af_calorific, DEFAULT_AF_CALORIFIC)?,
            coal_calorific: self.optional(
                "coal_calorific",
                raw.coal_calorific,
                DEFAULT_COAL_CALORIFIC,
            )?,
        };

        debug!(timestamp = %reading.timestamp, "Validated reading");
        Ok(reading)
    }

    /// Validate a required numeric field
    fn require(&self, field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
        let value = value.ok_or(ValidationError::MissingField(field))?;
        self.validate_finite(field, value)
    }

    /// Validate an optional numeric field, substituting its default
    fn optional(
        &self,
        field: &'static str,
        value: Option<f64>,
        default: f64,
    ) -> Result<f64, ValidationError> {
        self.validate_finite(field, value.unwrap_or(default))
    }

    /// Reject NaN and infinities
    fn validate_finite(&self, field: &'static str, value: f64) -> Result<f64, ValidationError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ValidationError::NonFinite { field, value })
        }
    }
}
