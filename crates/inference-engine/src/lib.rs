//! Kiln Model Inference
//!
//! Capability interface to the external regression model, the wire payload
//! it speaks, and an engine wrapper that times calls and vets the output.

mod engine;
mod payload;
mod predictor;

pub use engine::{InferenceEngine, InferenceResult};
pub use payload::{decode_prediction, decode_predictions, PredictRequest};
pub use predictor::{MockPredictor, Predictor, Transport, WirePredictor};

use thiserror::Error;

/// Errors raised by a predictor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("Prediction service unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid prediction response: {0}")]
    InvalidResponse(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Non-finite input {feature} = {value} in instance {instance}")]
    NonFiniteInput {
        instance: usize,
        feature: &'static str,
        value: f64,
    },
}

/// Errors during inference
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Predict(#[from] PredictError),
    #[error("Model returned a non-finite prediction: {0}")]
    NonFiniteOutput(f64),
}
