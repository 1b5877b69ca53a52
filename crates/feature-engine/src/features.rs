//! Feature Record Derivation

use crate::statistics::{lag_values, rolling_mean};
use crate::temporal::CyclicalTime;
use crate::FeatureError;
use history_window::SensorReading;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Guard added to every denominator that could be zero
pub const EPSILON: f64 = 1e-5;

/// Number of kiln temperature lags
pub const LAG_COUNT: usize = 6;

/// Rolling mean window sizes
pub const ROLLING_WINDOWS: [usize; 4] = [3, 5, 7, 10];

/// Features derived once per reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub hour: u32,
    pub minute: u32,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub minute_sin: f64,
    pub minute_cos: f64,

    /// Kiln temperature of the most recent prior reading
    pub prev_temp_1: f64,
    pub prev_temp_2: f64,
    pub prev_temp_3: f64,
    pub prev_temp_4: f64,
    pub prev_temp_5: f64,
    pub prev_temp_6: f64,

    pub rolling_3: f64,
    pub rolling_5: f64,
    pub rolling_7: f64,
    pub rolling_10: f64,

    pub motor_feeder: f64,
    pub motor_fuel: f64,
    pub motor_feeder_fuel: f64,
    pub grind_raw_ratio: f64,
    pub motor_emission: f64,
    pub fuel_pressure: f64,
    pub vibration_motor: f64,
}

impl FeatureRecord {
    /// Lag features, most recent first
    pub fn lags(&self) -> [f64; LAG_COUNT] {
        [
            self.prev_temp_1,
            self.prev_temp_2,
            self.prev_temp_3,
            self.prev_temp_4,
            self.prev_temp_5,
            self.prev_temp_6,
        ]
    }

    /// Rolling means in [`ROLLING_WINDOWS`] order
    pub fn rolling(&self) -> [f64; 4] {
        [self.rolling_3, self.rolling_5, self.rolling_7, self.rolling_10]
    }

    /// Interaction terms with their column names
    pub fn interactions(&self) -> [(&'static str, f64); 7] {
        [
            ("motor_feeder", self.motor_feeder),
            ("motor_fuel", self.motor_fuel),
            ("motor_feeder_fuel", self.motor_feeder_fuel),
            ("grind_raw_ratio", self.grind_raw_ratio),
            ("motor_emission", self.motor_emission),
            ("fuel_pressure", self.fuel_pressure),
            ("vibration_motor", self.vibration_motor),
        ]
    }

    /// First derived value that is NaN or infinite, if any
    pub fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        let rolling = ["rolling_3", "rolling_5", "rolling_7", "rolling_10"]
            .into_iter()
            .zip(self.rolling());
        self.interactions()
            .into_iter()
            .chain(rolling)
            .find(|(_, value)| !value.is_finite())
    }
}

/// Derives feature records from a reading and its prior history
#[derive(Debug, Clone, Default)]
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Create a new deriver
    pub fn new() -> Self {
        Self
    }

    /// Derive the feature record for `reading`
    ///
    /// `history` holds the readings that came before `reading`, oldest first,
    /// and must not contain `reading` itself. Windows that are not yet full fall
    /// back to the reading's own kiln temperature.
    pub fn derive(
        &self,
        reading: &SensorReading,
        history: &[SensorReading],
    ) -> Result<FeatureRecord, FeatureError> {
        if let Some((field, value)) = reading.first_non_finite() {
            return Err(FeatureError::InvalidInput { field, value });
        }
        Self::check_order(reading, history)?;

        let temps: Vec<f64> = history.iter().map(|r| r.kiln_temp).collect();
        if let Some(&value) = temps.iter().find(|t| !t.is_finite()) {
            return Err(FeatureError::InvalidInput {
                field: "history.kiln_temp",
                value,
            });
        }

        let time = CyclicalTime::from_timestamp(&reading.timestamp);
        let lags = lag_values(&temps);
        let rolling = ROLLING_WINDOWS
            .map(|w| rolling_mean(&temps, w).unwrap_or(reading.kiln_temp));

        if temps.len() < ROLLING_WINDOWS[ROLLING_WINDOWS.len() - 1] {
            debug!(
                history = temps.len(),
                "Cold start: rolling windows fall back to current kiln temperature"
            );
        }

        let r = reading;
        let record = FeatureRecord {
            hour: time.hour,
            minute: time.minute,
            hour_sin: time.hour_sin,
            hour_cos: time.hour_cos,
            minute_sin: time.minute_sin,
            minute_cos: time.minute_cos,

            prev_temp_1: lags[0],
            prev_temp_2: lags[1],
            prev_temp_3: lags[2],
            prev_temp_4: lags[3],
            prev_temp_5: lags[4],
            prev_temp_6: lags[5],

            rolling_3: rolling[0],
            rolling_5: rolling[1],
            rolling_7: rolling[2],
            rolling_10: rolling[3],

            motor_feeder: r.motor_load * r.feeder_rate,
            motor_fuel: r.motor_load / (r.fuel_rate + EPSILON),
            motor_feeder_fuel: r.motor_load * r.feeder_rate / (r.fuel_rate + EPSILON),
            grind_raw_ratio: r.grinding_power / (r.raw_feed + EPSILON),
            motor_emission: r.motor_load * r.emissions,
            fuel_pressure: r.fuel_rate * r.pressure,
            vibration_motor: r.vibration * r.motor_load,
        };

        // A denominator can still hit zero (fuel_rate == -EPSILON) or a product overflow
        if let Some((field, value)) = record.first_non_finite() {
            return Err(FeatureError::InvalidInput { field, value });
        }
        Ok(record)
    }

    /// History must be strictly increasing in time and end before `reading`
    fn check_order(reading: &SensorReading, history: &[SensorReading]) -> Result<(), FeatureError> {
        let timestamps = history
            .iter()
            .map(|r| r.timestamp)
            .chain(std::iter::once(reading.timestamp));

        let mut previous = None;
        for ts in timestamps {
            if let Some(earlier) = previous {
                if earlier >= ts {
                    return Err(FeatureError::UnorderedHistory { earlier, later: ts });
                }
            }
            previous = Some(ts);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 15, 10, 0, 0).unwrap()
    }

    fn reading(minute: i64, kiln_temp: f64) -> SensorReading {
        SensorReading {
            timestamp: base_time() + Duration::minutes(minute),
            kiln_temp,
            motor_load: 100.0,
            feeder_rate: 50.0,
            emissions: 10.0,
            vibration: 1.0,
            pressure: 5.0,
            fuel_rate: 20.0,
            raw_feed: 200.0,
            grinding_power: 300.0,
            ..Default::default()
        }
    }

    fn history(temps: &[f64]) -> Vec<SensorReading> {
        temps
            .iter()
            .enumerate()
            .map(|(i, &t)| reading(i as i64, t))
            .collect()
    }

    #[test]
    fn test_cold_start() {
        let features = FeatureDeriver::new().derive(&reading(0, 1150.0), &[]).unwrap();

        assert_eq!(features.lags(), [0.0; LAG_COUNT]);
        assert_eq!(features.rolling(), [1150.0; 4]);
    }

    #[test]
    fn test_partial_history() {
        let prior = history(&[1100.0, 1110.0, 1120.0, 1130.0]);
        let features = FeatureDeriver::new()
            .derive(&reading(10, 1200.0), &prior)
            .unwrap();

        assert_eq!(features.lags(), [1130.0, 1120.0, 1110.0, 1100.0, 0.0, 0.0]);
        assert_eq!(features.rolling_3, 1120.0);
        // Not enough priors for the wider windows
        assert_eq!(features.rolling_5, 1200.0);
        assert_eq!(features.rolling_7, 1200.0);
        assert_eq!(features.rolling_10, 1200.0);
    }

    #[test]
    fn test_full_history() {
        let temps: Vec<f64> = (1..=10).map(|i| i as f64 * 100.0).collect();
        let prior = history(&temps);
        let features = FeatureDeriver::new()
            .derive(&reading(20, 5.0), &prior)
            .unwrap();

        assert_eq!(features.lags(), [1000.0, 900.0, 800.0, 700.0, 600.0, 500.0]);
        assert_eq!(features.rolling_3, 900.0);
        assert_eq!(features.rolling_5, 800.0);
        assert_eq!(features.rolling_7, 700.0);
        assert_eq!(features.rolling_10, 550.0);
    }

    #[test]
    fn test_interactions() {
        let features = FeatureDeriver::new().derive(&reading(22, 1150.0), &[]).unwrap();

        assert_eq!(features.motor_feeder, 5000.0);
        assert!((features.motor_fuel - 4.999_997_5).abs() < 1e-6);
        assert!((features.motor_feeder_fuel - 249.999_875).abs() < 1e-4);
        assert!((features.grind_raw_ratio - 1.499_999_925).abs() < 1e-8);
        assert_eq!(features.motor_emission, 1000.0);
        assert_eq!(features.fuel_pressure, 100.0);
        assert_eq!(features.vibration_motor, 100.0);
        assert_eq!((features.hour, features.minute), (10, 22));
    }

    #[test]
    fn test_zero_denominators_stay_finite() {
        let r = SensorReading {
            fuel_rate: 0.0,
            raw_feed: 0.0,
            ..reading(0, 1150.0)
        };
        let features = FeatureDeriver::new().derive(&r, &[]).unwrap();
        assert!(features.motor_fuel.is_finite());
        assert!(features.grind_raw_ratio.is_finite());
    }

    #[test]
    fn test_non_finite_rejected() {
        let r = SensorReading {
            vibration: f64::NAN,
            ..reading(0, 1150.0)
        };
        assert!(matches!(
            FeatureDeriver::new().derive(&r, &[]),
            Err(FeatureError::InvalidInput { field: "vibration", .. })
        ));
    }

    #[test]
    fn test_non_finite_interaction_rejected() {
        let r = SensorReading {
            fuel_rate: -1e-5,
            motor_load: 10.0,
            ..reading(0, 1150.0)
        };
        let err = FeatureDeriver::new().derive(&r, &[]).unwrap_err();
        match err {
            FeatureError::InvalidInput { field, value } => {
                assert_eq!(field, "motor_fuel");
                assert!(value.is_infinite());
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let r = SensorReading {
            emissions: f64::MAX,
            ..reading(0, 1150.0)
        };
        assert!(matches!(
            FeatureDeriver::new().derive(&r, &[]),
            Err(FeatureError::InvalidInput { field: "motor_emission", .. })
        ));
    }

    #[test]
    fn test_unordered_history_rejected() {
        let mut prior = history(&[1100.0, 1110.0, 1120.0]);
        prior.swap(0, 2);
        assert!(matches!(
            FeatureDeriver::new().derive(&reading(10, 1150.0), &prior),
            Err(FeatureError::UnorderedHistory { .. })
        ));

        // A reading that "sees itself" is rejected too
        let prior = history(&[1100.0]);
        assert!(FeatureDeriver::new().derive(&prior[0], &prior).is_err());
    }

    proptest! {
        #[test]
        fn prop_empty_history_falls_back(kiln_temp in 500.0f64..1600.0, minute in 0i64..1440) {
            let features = FeatureDeriver::new().derive(&reading(minute, kiln_temp), &[]).unwrap();
            prop_assert_eq!(features.lags(), [0.0; LAG_COUNT]);
            prop_assert_eq!(features.rolling(), [kiln_temp; 4]);
            prop_assert!(features.hour < 24 && features.minute < 60);
        }
    }
}
