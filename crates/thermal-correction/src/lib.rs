//! Thermal Correction
//!
//! Adjusts a model-predicted kiln temperature for the share of alternative
//! fuel blended with coal, and computes the fuel feed needed to hold the same
//! heat input.

mod calculator;
mod report;

pub use calculator::{ThermalCorrector, ThermalInput, ThermalResult, DEFAULT_DEG_PER_PCT};
pub use report::{round2, CorrectionReport};

use thiserror::Error;

/// Errors during thermal correction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThermalError {
    /// Input is NaN or infinite
    #[error("Invalid input: {field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// Coal calorific value of zero denotes an upstream measurement error
    #[error("Invalid input: coal calorific value must be non-zero")]
    ZeroCoalCalorific,
}
