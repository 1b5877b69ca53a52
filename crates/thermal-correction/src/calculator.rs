//! Closed-Form Blend Correction

use crate::ThermalError;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Degrees lost per percentage point of heat-ratio shortfall
pub const DEFAULT_DEG_PER_PCT: f64 = 2.0;

/// Inputs to the correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalInput {
    /// Model-predicted kiln temperature (°C)
    pub base_temp: f64,
    /// Coal calorific value
    pub coal_cv: f64,
    /// Alternative fuel calorific value
    pub af_cv: f64,
    /// Alternative fuel share (%), clamped to 0–100
    pub af_pct: f64,
    /// Current fuel feed rate
    pub current_fuel_rate: f64,
}

/// Outputs of the correction at full precision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalResult {
    pub effective_cv: f64,
    pub heat_ratio: f64,
    pub adjusted_temp: f64,
    pub required_fuel_rate: f64,
}

/// Thermal correction calculator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalCorrector {
    deg_per_pct: f64,
}

impl Default for ThermalCorrector {
    fn default() -> Self {
        Self::new(DEFAULT_DEG_PER_PCT)
    }
}

impl ThermalCorrector {
    /// Create a corrector with the given temperature sensitivity
    pub fn new(deg_per_pct: f64) -> Self {
        Self { deg_per_pct }
    }

    /// Degrees per percentage point of heat shortfall
    pub fn deg_per_pct(&self) -> f64 {
        self.deg_per_pct
    }

    /// Alternative fuel share actually applied, in percent
    pub fn applied_share(af_pct: f64) -> f64 {
        af_pct.clamp(0.0, 100.0)
    }

    /// Linear blend of calorific values
    pub fn effective_cv(coal_cv: f64, af_cv: f64, af_pct: f64) -> f64 {
        let share = Self::applied_share(af_pct) / 100.0;
        (1.0 - share) * coal_cv + share * af_cv
    }

    /// Blended heat input relative to coal alone
    pub fn heat_ratio(coal_cv: f64, af_cv: f64, af_pct: f64) -> Result<f64, ThermalError> {
        if coal_cv == 0.0 {
            return Err(ThermalError::ZeroCoalCalorific);
        }
        Ok(Self::effective_cv(coal_cv, af_cv, af_pct) / coal_cv)
    }

    /// Temperature after accounting for the heat ratio
    pub fn adjusted_temp(&self, base_temp: f64, heat_ratio: f64) -> f64 {
        let percent_drop = (1.0 - heat_ratio) * 100.0;
        base_temp - percent_drop * self.deg_per_pct
    }

    /// Fuel rate holding the coal-only heat input
    ///
    /// A non-positive heat ratio leaves the current rate unchanged.
    pub fn required_fuel_rate(current_fuel_rate: f64, heat_ratio: f64) -> f64 {
        if heat_ratio > 0.0 {
            current_fuel_rate / heat_ratio
        } else {
            current_fuel_rate
        }
    }

    /// Run the full correction
    pub fn correct(&self, input: &ThermalInput) -> Result<ThermalResult, ThermalError> {
        Self::check_finite(input)?;

        let effective_cv = Self::effective_cv(input.coal_cv, input.af_cv, input.af_pct);
        let heat_ratio = Self::heat_ratio(input.coal_cv, input.af_cv, input.af_pct)?;
        let adjusted_temp = self.adjusted_temp(input.base_temp, heat_ratio);
        let required_fuel_rate = Self::required_fuel_rate(input.current_fuel_rate, heat_ratio);

        trace!(effective_cv, heat_ratio, adjusted_temp, required_fuel_rate, "Thermal correction");

        Ok(ThermalResult {
            effective_cv,
            heat_ratio,
            adjusted_temp,
            required_fuel_rate,
        })
    }

    fn check_finite(input: &ThermalInput) -> Result<(), ThermalError> {
        let fields = [
            ("base_temp", input.base_temp),
            ("coal_cv", input.coal_cv),
            ("af_cv", input.af_cv),
            ("af_pct", input.af_pct),
            ("current_fuel_rate", input.current_fuel_rate),
        ];
        match fields.into_iter().find(|(_, v)| !v.is_finite()) {
            Some((field, value)) => Err(ThermalError::NonFinite { field, value }),
            None => Ok(()),
        }
    }
}
