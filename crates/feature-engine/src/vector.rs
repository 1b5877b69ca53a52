//! Feature Vector Serialization

use crate::features::FeatureRecord;
use history_window::SensorReading;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of model inputs
pub const FEATURE_DIMENSION: usize = 31;

/// Model input order; the model was trained on exactly this sequence
pub const FEATURE_NAMES: [&str; FEATURE_DIMENSION] = [
    "motor_load",
    "feeder_rate",
    "emissions",
    "vibration",
    "pressure",
    "fuel_rate",
    "raw_feed",
    "grinding_power",
    "hour",
    "minute",
    "hour_sin",
    "hour_cos",
    "minute_sin",
    "minute_cos",
    "prev_temp_1",
    "prev_temp_2",
    "prev_temp_3",
    "prev_temp_4",
    "prev_temp_5",
    "prev_temp_6",
    "rolling_3",
    "rolling_5",
    "rolling_7",
    "rolling_10",
    "motor_feeder",
    "motor_fuel",
    "motor_feeder_fuel",
    "grind_raw_ratio",
    "motor_emission",
    "fuel_pressure",
    "vibration_motor",
];

/// Fixed-order model input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub values: [f64; FEATURE_DIMENSION],
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            values: [0.0; FEATURE_DIMENSION],
        }
    }
}

impl FeatureVector {
    /// Project a reading and its derived features into model order
    pub fn from_record(reading: &SensorReading, features: &FeatureRecord) -> Self {
        let r = reading;
        let f = features;
        Self {
            values: [
                r.motor_load,
                r.feeder_rate,
                r.emissions,
                r.vibration,
                r.pressure,
                r.fuel_rate,
                r.raw_feed,
                r.grinding_power,
                f.hour as f64,
                f.minute as f64,
                f.hour_sin,
                f.hour_cos,
                f.minute_sin,
                f.minute_cos,
                f.prev_temp_1,
                f.prev_temp_2,
                f.prev_temp_3,
                f.prev_temp_4,
                f.prev_temp_5,
                f.prev_temp_6,
                f.rolling_3,
                f.rolling_5,
                f.rolling_7,
                f.rolling_10,
                f.motor_feeder,
                f.motor_fuel,
                f.motor_feeder_fuel,
                f.grind_raw_ratio,
                f.motor_emission,
                f.fuel_pressure,
                f.vibration_motor,
            ],
        }
    }

    /// Build a vector from a loosely populated JSON object
    ///
    /// Absent or non-numeric entries become `0.0`; anything that is not an
    /// object yields the zero vector.
    pub fn from_fields(fields: &Value) -> Self {
        let mut values = [0.0; FEATURE_DIMENSION];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES.iter()) {
            *slot = fields.get(*name).and_then(Value::as_f64).unwrap_or(0.0);
        }
        Self { values }
    }

    /// Value of a named slot
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.values[idx])
    }

    /// Values in model order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// `(name, value)` pairs in model order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Check that every slot is finite
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureDeriver;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    fn reading(minute: i64, kiln_temp: f64) -> SensorReading {
        SensorReading {
            timestamp: Utc.with_ymd_and_hms(2025, 9, 15, 10, 0, 0).unwrap()
                + Duration::minutes(minute),
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

    #[test]
    fn test_order_matches_names() {
        let prior: Vec<_> = (0..6).map(|i| reading(i, 601.0 + i as f64)).collect();
        let current = reading(22, 1150.0);
        let features = FeatureDeriver::new().derive(&current, &prior).unwrap();
        let vector = FeatureVector::from_record(&current, &features);

        assert_eq!(vector.values.len(), FEATURE_DIMENSION);
        assert_eq!(vector.get("motor_load"), Some(100.0));
        assert_eq!(vector.get("minute"), Some(22.0));
        assert_eq!(vector.get("prev_temp_1"), Some(606.0));
        assert_eq!(vector.get("prev_temp_6"), Some(601.0));
        assert_eq!(vector.get("vibration_motor"), Some(100.0));
        assert_eq!(vector.values[FEATURE_DIMENSION - 1], 100.0);
        assert_eq!(vector.get("kiln_temp"), None);
    }

    #[test]
    fn test_from_fields_matches_record() {
        let prior: Vec<_> = (0..8).map(|i| reading(i, 1100.0 + i as f64)).collect();
        let current = reading(30, 1150.0);
        let features = FeatureDeriver::new().derive(&current, &prior).unwrap();

        // Flattened reading + features as an upstream system would store them
        let mut fields = serde_json::to_value(&current).unwrap();
        let extra = serde_json::to_value(&features).unwrap();
        if let (Some(obj), Some(extra)) = (fields.as_object_mut(), extra.as_object()) {
            obj.extend(extra.clone());
        }

        assert_eq!(
            FeatureVector::from_fields(&fields),
            FeatureVector::from_record(&current, &features)
        );
    }

    #[test]
    fn test_from_fields_is_lenient() {
        let vector = FeatureVector::from_fields(&json!({
            "motor_load": 12.5,
            "hour": 7,
            "rolling_3": "not a number",
            "unknown": 99.0
        }));

        assert_eq!(vector.values[0], 12.5);
        assert_eq!(vector.get("hour"), Some(7.0));
        assert_eq!(vector.get("rolling_3"), Some(0.0));
        assert_eq!(vector.named().filter(|(_, v)| *v != 0.0).count(), 2);

        assert_eq!(FeatureVector::from_fields(&json!([1, 2, 3])), FeatureVector::default());
    }

    #[test]
    fn test_names_are_unique() {
        let mut names = FEATURE_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FEATURE_DIMENSION);
    }

    proptest! {
        #[test]
        fn prop_vector_shape_is_fixed(
            temps in proptest::collection::vec(900.0f64..1300.0, 0..10),
            kiln_temp in 900.0f64..1300.0,
        ) {
            let prior: Vec<_> = temps
                .iter()
                .enumerate()
                .map(|(i, t)| reading(i as i64, *t))
                .collect();
            let current = reading(60, kiln_temp);
            let features = FeatureDeriver::new().derive(&current, &prior).unwrap();
            let vector = FeatureVector::from_record(&current, &features);

            prop_assert_eq!(vector.as_slice().len(), FEATURE_DIMENSION);
            prop_assert!(vector.is_finite());
            let names: Vec<_> = vector.named().map(|(n, _)| n).collect();
            prop_assert_eq!(names, FEATURE_NAMES.to_vec());
        }
    }
}
