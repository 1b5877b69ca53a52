//! Prediction Wire Payloads

use crate::PredictError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the hosted model: `{"instances": [[31 floats], ...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub instances: Vec<Vec<f64>>,
}

impl PredictRequest {
    /// Request for a single feature vector
    pub fn single(features: &FeatureVector) -> Self {
        Self::from_vectors(std::slice::from_ref(features))
    }

    /// Request for a batch of feature vectors
    pub fn from_vectors(batch: &[FeatureVector]) -> Self {
        Self {
            instances: batch.iter().map(|f| f.as_slice().to_vec()).collect(),
        }
    }

    /// Check every instance has the model's input width and only finite values
    ///
    /// JSON has no encoding for NaN or infinity, so such values would reach
    /// the model as `null`.
    pub fn validate(&self) -> Result<(), PredictError> {
        for (instance, row) in self.instances.iter().enumerate() {
            if row.len() != FEATURE_DIMENSION {
                return Err(PredictError::InvalidInputShape {
                    expected: FEATURE_DIMENSION,
                    actual: row.len(),
                });
            }
            if let Some((&feature, &value)) = FEATURE_NAMES
                .iter()
                .zip(row)
                .find(|(_, value)| !value.is_finite())
            {
                return Err(PredictError::NonFiniteInput {
                    instance,
                    feature,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<String, PredictError> {
        serde_json::to_string(self).map_err(|e| PredictError::InvalidResponse(e.to_string()))
    }
}

/// Decode a model response into one value per instance
///
/// Accepts a bare number, a list of numbers, a list of single-element lists,
/// or an object carrying any of those under `predictions`.
pub fn decode_predictions(response: &Value) -> Result<Vec<f64>, PredictError> {
    let body = match response {
        Value::Object(map) => map.get("predictions").ok_or_else(|| {
            PredictError::InvalidResponse("object without `predictions`".to_string())
        })?,
        other => other,
    };

    match body {
        Value::Number(n) => Ok(vec![number(n)?]),
        Value::Array(items) => items.iter().map(scalar).collect(),
        other => Err(PredictError::InvalidResponse(format!(
            "unexpected prediction payload: {}",
            other
        ))),
    }
}

/// Decode a model response holding exactly one prediction
pub fn decode_prediction(response: &Value) -> Result<f64, PredictError> {
    let predictions = decode_predictions(response)?;
    match predictions.as_slice() {
        [value] => Ok(*value),
        [] => Err(PredictError::InvalidResponse("empty predictions".to_string())),
        many => Err(PredictError::InvalidResponse(format!(
            "expected one prediction, got {}",
            many.len()
        ))),
    }
}

fn scalar(item: &Value) -> Result<f64, PredictError> {
    match item {
        Value::Number(n) => number(n),
        Value::Array(inner) if inner.len() == 1 => scalar(&inner[0]),
        other => Err(PredictError::InvalidResponse(format!(
            "prediction is not a number: {}",
            other
        ))),
    }
}

fn number(n: &serde_json::Number) -> Result<f64, PredictError> {
    n.as_f64()
        .ok_or_else(|| PredictError::InvalidResponse(format!("unrepresentable number {}", n)))
}
