//! Rule-Based Advisory
//!
//! Threshold alerts, process optimization hints and operator-facing strategy
//! text. Nothing here feeds back into the prediction itself.

mod anomaly;
mod generator;
mod optimization;

pub use anomaly::{detect, Alert, AnomalyThresholds};
pub use generator::{
    build_prompt, generate_guidance, strategy_recommendations, AdvisoryError, TextGenerator,
};
pub use optimization::{
    co2_optimization, fuel_mix, holistic, raw_mill, Advice, Co2Hint, FuelMixHint, HolisticHint,
    RawMillHint,
};
