//! Inference Engine Implementation

use crate::predictor::{MockPredictor, Predictor};
use crate::{InferenceError, PredictError};
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Predicted baseline kiln temperature (°C)
    pub predicted_temp: f64,
    /// Inference latency in milliseconds
    pub latency_ms: u64,
    /// Predictor that produced the value
    pub model: String,
}

/// Inference engine over an injected predictor
#[derive(Clone)]
pub struct InferenceEngine {
    predictor: Arc<dyn Predictor>,
}

impl InferenceEngine {
    /// Create a new inference engine
    pub fn new(predictor: Arc<dyn Predictor>) -> Self {
        info!("Creating inference engine with predictor: {}", predictor.name());
        Self { predictor }
    }

    /// Create an engine backed by the offline mock predictor
    pub fn mock(bias: f64) -> Self {
        Self::new(Arc::new(MockPredictor::new(bias)))
    }

    /// Name of the underlying predictor
    pub fn model_name(&self) -> &str {
        self.predictor.name()
    }

    /// Run inference on a feature vector
    pub async fn predict(&self, features: &FeatureVector) -> Result<InferenceResult, InferenceError> {
        let start = std::time::Instant::now();

        // Predictors may block on network I/O; keep them off the async workers
        let predictor = Arc::clone(&self.predictor);
        let input = *features;
        let outcome = tokio::task::spawn_blocking(move || predictor.predict(&input))
            .await
            .map_err(|e| PredictError::Unavailable(format!("predictor task failed: {}", e)))
            .and_then(|result| result);

        let predicted_temp = outcome.map_err(|e| {
            warn!("Predictor {} failed: {}", self.predictor.name(), e);
            metrics::counter!("kiln_inference_failures_total").increment(1);
            InferenceError::from(e)
        })?;

        if !predicted_temp.is_finite() {
            warn!("Predictor {} returned {}", self.predictor.name(), predicted_temp);
            metrics::counter!("kiln_inference_failures_total").increment(1);
            return Err(InferenceError::NonFiniteOutput(predicted_temp));
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        metrics::histogram!("kiln_inference_latency_ms").record(latency_ms as f64);
        debug!("Inference completed in {}ms: {:.2}", latency_ms, predicted_temp);

        Ok(InferenceResult {
            predicted_temp,
            latency_ms,
            model: self.predictor.name().to_string(),
        })
    }
}
