//! Process Optimization Hints

use history_window::SensorReading;
use serde::{Deserialize, Serialize};

const HOT_KILN: f64 = 1150.0;
const HIGH_EMISSIONS: f64 = 400.0;
const HEAVY_MOTOR_LOAD: f64 = 85.0;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Raw mill grinding hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMillHint {
    pub grinding_speed: String,
    pub feed_rate_adjustment: f64,
}

/// Alternative fuel mix hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMixHint {
    pub alternative_fuel_increase: String,
    pub thermal_substitution_rate: f64,
}

/// CO₂ reduction hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Co2Hint {
    pub increase_alternative_fuel: String,
    pub reduce_kiln_temp: String,
    pub optimize_grinding_speed: String,
    pub predicted_co2_reduction_ppm: f64,
}

/// Plant-wide efficiency hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolisticHint {
    /// 0 to 100
    pub energy_efficiency_score: f64,
    pub recommendation: String,
}

/// Raw mill grinding speed and feed adjustment
pub fn raw_mill(reading: &SensorReading) -> RawMillHint {
    let grinding_speed = if reading.kiln_temp > HOT_KILN {
        "reduce 5%"
    } else {
        "increase 3%"
    };
    RawMillHint {
        grinding_speed: grinding_speed.to_string(),
        feed_rate_adjustment: round1(reading.feeder_rate * 0.98),
    }
}

/// Alternative fuel increase and thermal substitution rate
pub fn fuel_mix(reading: &SensorReading) -> FuelMixHint {
    let increase = if reading.emissions > HIGH_EMISSIONS {
        "5%"
    } else {
        "0%"
    };
    FuelMixHint {
        alternative_fuel_increase: increase.to_string(),
        thermal_substitution_rate: round1((50.0 + reading.emissions / 10.0).min(80.0)),
    }
}

/// CO₂ reduction levers and expected reduction
pub fn co2_optimization(reading: &SensorReading) -> Co2Hint {
    let af = if reading.emissions > HIGH_EMISSIONS {
        "5-10%"
    } else {
        "0-5%"
    };
    let kiln = if reading.kiln_temp > HOT_KILN {
        "2-3%"
    } else {
        "0%"
    };
    let grinding = if reading.motor_load > HEAVY_MOTOR_LOAD {
        "reduce 2-3%"
    } else {
        "maintain"
    };
    Co2Hint {
        increase_alternative_fuel: af.to_string(),
        reduce_kiln_temp: kiln.to_string(),
        optimize_grinding_speed: grinding.to_string(),
        predicted_co2_reduction_ppm: round1((reading.emissions * 0.05).min(20.0)),
    }
}

/// Energy efficiency score from kiln temperature and motor load
pub fn holistic(reading: &SensorReading) -> HolisticHint {
    let score =
        100.0 - (reading.kiln_temp - 1100.0) / 5.0 - (reading.motor_load - 80.0) / 2.0;
    HolisticHint {
        energy_efficiency_score: score.clamp(0.0, 100.0),
        recommendation: "Reduce kiln temp 2% and optimize feed rate".to_string(),
    }
}

/// All optimization hints for one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub raw_mill: RawMillHint,
    pub fuel_mix: FuelMixHint,
    pub holistic: HolisticHint,
    pub co2: Co2Hint,
}

impl Advice {
    /// Evaluate every hint
    pub fn for_reading(reading: &SensorReading) -> Self {
        Self {
            raw_mill: raw_mill(reading),
            fuel_mix: fuel_mix(reading),
            holistic: holistic(reading),
            co2: co2_optimization(reading),
        }
    }

    /// Flatten into operator messages
    pub fn messages(&self) -> Vec<String> {
        vec![
            format!("Grinding speed: {}", self.raw_mill.grinding_speed),
            format!("Feed rate adjustment: {}", self.raw_mill.feed_rate_adjustment),
            format!(
                "Alternative fuel increase: {}",
                self.fuel_mix.alternative_fuel_increase
            ),
            format!(
                "Thermal substitution rate: {}",
                self.fuel_mix.thermal_substitution_rate
            ),
            self.holistic.recommendation.clone(),
            format!(
                "Increase alternative fuel: {}",
                self.co2.increase_alternative_fuel
            ),
            format!("Reduce kiln temperature: {}", self.co2.reduce_kiln_temp),
            format!("Grinding speed for CO2: {}", self.co2.optimize_grinding_speed),
            format!(
                "Predicted CO2 reduction: {} ppm",
                self.co2.predicted_co2_reduction_ppm
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reading(kiln_temp: f64, motor_load: f64, emissions: f64, feeder_rate: f64) -> SensorReading {
        SensorReading {
            kiln_temp,
            motor_load,
            emissions,
            feeder_rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_raw_mill() {
        let hot = raw_mill(&reading(1160.0, 15.0, 320.0, 98.7));
        assert_eq!(hot.grinding_speed, "reduce 5%");
        assert_eq!(hot.feed_rate_adjustment, 96.7);

        let cool = raw_mill(&reading(1150.0, 15.0, 320.0, 100.0));
        assert_eq!(cool.grinding_speed, "increase 3%");
        assert_eq!(cool.feed_rate_adjustment, 98.0);
    }

    #[test]
    fn test_fuel_mix() {
        let clean = fuel_mix(&reading(1150.0, 15.0, 320.0, 100.0));
        assert_eq!(clean.alternative_fuel_increase, "0%");
        assert_eq!(clean.thermal_substitution_rate, 80.0);

        let low = fuel_mix(&reading(1150.0, 15.0, 123.0, 100.0));
        assert_eq!(low.thermal_substitution_rate, 62.3);

        let dirty = fuel_mix(&reading(1150.0, 15.0, 450.0, 100.0));
        assert_eq!(dirty.alternative_fuel_increase, "5%");
    }

    #[test]
    fn test_co2_levers() {
        let quiet = co2_optimization(&reading(1100.0, 50.0, 100.0, 100.0));
        assert_eq!(quiet.increase_alternative_fuel, "0-5%");
        assert_eq!(quiet.reduce_kiln_temp, "0%");
        assert_eq!(quiet.optimize_grinding_speed, "maintain");
        assert_eq!(quiet.predicted_co2_reduction_ppm, 5.0);

        let busy = co2_optimization(&reading(1180.0, 88.0, 450.0, 100.0));
        assert_eq!(busy.increase_alternative_fuel, "5-10%");
        assert_eq!(busy.reduce_kiln_temp, "2-3%");
        assert_eq!(busy.optimize_grinding_speed, "reduce 2-3%");
        assert_eq!(busy.predicted_co2_reduction_ppm, 20.0);
    }

    #[test]
    fn test_holistic_score() {
        assert_eq!(holistic(&reading(1100.0, 80.0, 0.0, 0.0)).energy_efficiency_score, 100.0);
        assert_eq!(holistic(&reading(1150.0, 90.0, 0.0, 0.0)).energy_efficiency_score, 85.0);
        assert_eq!(holistic(&reading(1700.0, 90.0, 0.0, 0.0)).energy_efficiency_score, 0.0);
        // Cool kiln and light load would exceed 100
        assert_eq!(holistic(&reading(1000.0, 15.0, 0.0, 0.0)).energy_efficiency_score, 100.0);
    }

    #[test]
    fn test_advice_messages() {
        let advice = Advice::for_reading(&reading(1160.0, 15.0, 320.0, 100.0));
        let messages = advice.messages();
        assert_eq!(messages.len(), 9);
        assert!(messages.contains(&"Grinding speed: reduce 5%".to_string()));
    }

    proptest! {
        #[test]
        fn prop_score_bounded(kiln in 0.0f64..2000.0, motor in 0.0f64..100.0) {
            let score = holistic(&reading(kiln, motor, 0.0, 0.0)).energy_efficiency_score;
            prop_assert!((0.0..=100.0).contains(&score));
        }

        #[test]
        fn prop_substitution_capped(emissions in 0.0f64..5000.0) {
            let hint = fuel_mix(&reading(1150.0, 15.0, emissions, 0.0));
            prop_assert!(hint.thermal_substitution_rate <= 80.0);
        }
    }
}
