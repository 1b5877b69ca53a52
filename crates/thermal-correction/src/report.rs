//! Boundary Correction Report

use crate::calculator::{ThermalCorrector, ThermalInput, ThermalResult};
use serde::{Deserialize, Serialize};

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Correction output handed to external consumers
///
/// Values are rounded here and nowhere earlier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionReport {
    pub base_prediction: f64,
    pub adjusted_prediction: f64,
    pub required_fuel_rate: f64,
    pub fuel_rate_delta: f64,
    pub af_share_pct: f64,
    pub af_calorific: f64,
}

impl CorrectionReport {
    /// Build the report from a correction's input and full-precision result
    pub fn new(input: &ThermalInput, result: &ThermalResult) -> Self {
        Self {
            base_prediction: round2(input.base_temp),
            adjusted_prediction: round2(result.adjusted_temp),
            required_fuel_rate: round2(result.required_fuel_rate),
            fuel_rate_delta: round2(result.required_fuel_rate - input.current_fuel_rate),
            af_share_pct: round2(ThermalCorrector::applied_share(input.af_pct)),
            af_calorific: round2(input.af_cv),
        }
    }
}
