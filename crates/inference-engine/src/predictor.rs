//! Predictor Capability

use crate::payload::{decode_predictions, PredictRequest};
use crate::PredictError;
use feature_engine::FeatureVector;
use tracing::debug;

/// External regression model
///
/// Implementations wrap whatever serves the model; the pipeline only ever
/// sees this interface.
pub trait Predictor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str {
        "predictor"
    }

    /// Predict the baseline kiln temperature for one feature vector
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictError>;

    /// Predict a batch, one value per vector
    fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<f64>, PredictError> {
        batch.iter().map(|f| self.predict(f)).collect()
    }
}

impl<F> Predictor for F
where
    F: Fn(&FeatureVector) -> Result<f64, PredictError> + Send + Sync,
{
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        self(features)
    }
}

/// Deterministic stand-in for the hosted model
///
/// Blends the short, medium and long rolling means; useful for offline replay
/// and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockPredictor {
    /// Constant offset added to every prediction (°C)
    bias: f64,
}

impl MockPredictor {
    /// Create a mock predictor with the given bias
    pub fn new(bias: f64) -> Self {
        Self { bias }
    }
}

impl Predictor for MockPredictor {
    fn name(&self) -> &str {
        "mock"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        let rolling = |name: &str| features.get(name).unwrap_or(0.0);
        let prediction =
            0.5 * rolling("rolling_3") + 0.3 * rolling("rolling_5") + 0.2 * rolling("rolling_10");
        Ok(prediction + self.bias)
    }
}

/// Raw request/response exchange with a hosted model
pub trait Transport: Send + Sync {
    /// Send a JSON request body, returning the JSON response body
    fn call(&self, body: &str) -> Result<String, PredictError>;
}

/// Predictor speaking the `{instances: [...]}` wire contract over a transport
pub struct WirePredictor<T> {
    transport: T,
}

impl<T: Transport> WirePredictor<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn exchange(&self, request: &PredictRequest) -> Result<Vec<f64>, PredictError> {
        request.validate()?;
        let body = request.to_json()?;
        let response = self.transport.call(&body)?;
        let value: serde_json::Value = serde_json::from_str(&response)
            .map_err(|e| PredictError::InvalidResponse(e.to_string()))?;

        let predictions = decode_predictions(&value)?;
        if predictions.len() != request.instances.len() {
            return Err(PredictError::InvalidResponse(format!(
                "expected {} predictions, got {}",
                request.instances.len(),
                predictions.len()
            )));
        }
        debug!(count = predictions.len(), "Decoded model predictions");
        Ok(predictions)
    }
}

impl<T: Transport> Predictor for WirePredictor<T> {
    fn name(&self) -> &str {
        "wire"
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        let predictions = self.exchange(&PredictRequest::single(features))?;
        Ok(predictions[0])
    }

    fn predict_batch(&self, batch: &[FeatureVector]) -> Result<Vec<f64>, PredictError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        self.exchange(&PredictRequest::from_vectors(batch))
    }
}
