//! Pipeline Orchestration

use crate::{PipelineConfig, PipelineError};
use advisory::{Advice, Alert, TextGenerator};
use chrono::Utc;
use data_validator::{RawReading, Validator};
use feature_engine::{FeatureDeriver, FeatureRecord, FeatureVector};
use history_window::{HistoryWindow, SensorReading, WindowStore};
use inference_engine::{InferenceEngine, Predictor};
use serde::Serialize;
use std::sync::Arc;
use storage::{PredictionRecord, RecordSink, SensorRecord};
use thermal_correction::{CorrectionReport, ThermalCorrector, ThermalInput};
use tracing::{debug, info, warn};

/// Prediction step outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Prediction {
    /// The model answered and the value was corrected for the fuel mix
    Available {
        model: String,
        latency_ms: u64,
        report: CorrectionReport,
    },
    /// The model could not produce a value; the reading was still recorded
    Unavailable { reason: String },
}

impl Prediction {
    /// Correction report, when the model answered
    pub fn report(&self) -> Option<&CorrectionReport> {
        match self {
            Prediction::Available { report, .. } => Some(report),
            Prediction::Unavailable { .. } => None,
        }
    }
}

/// Everything produced for one accepted reading
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub sensor_id: String,
    pub reading: SensorReading,
    pub features: FeatureRecord,
    pub vector: FeatureVector,
    pub prediction: Prediction,
    pub alerts: Vec<Alert>,
    pub advice: Advice,
    pub recommendations: Vec<String>,
    /// Free-form text from the optional generator
    pub guidance: Option<String>,
    /// Id assigned by the sink to the prediction record
    pub prediction_id: Option<i64>,
}

impl Outcome {
    /// Alerts, hints and recommendations as flat operator messages
    pub fn messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self.alerts.iter().map(|a| a.to_string()).collect();
        messages.extend(self.advice.messages());
        messages.extend(self.recommendations.iter().cloned());
        messages.extend(self.guidance.iter().cloned());
        messages
    }
}

/// A reading from a replay batch that was not processed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayFailure {
    /// Position in the input batch
    pub index: usize,
    pub sensor_id: String,
    pub error: String,
}

/// Result of replaying a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplayReport {
    /// Processed readings in processing order
    pub outcomes: Vec<Outcome>,
    pub failures: Vec<ReplayFailure>,
}

/// Builder for [`KilnPipeline`]
pub struct PipelineBuilder {
    config: PipelineConfig,
    engine: Option<InferenceEngine>,
    sink: Option<Arc<dyn RecordSink>>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl PipelineBuilder {
    /// Use a specific predictor instead of the mock
    pub fn predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.engine = Some(InferenceEngine::new(predictor));
        self
    }

    /// Use a prepared inference engine
    pub fn engine(mut self, engine: InferenceEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Persist records to `sink`
    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Ask `generator` for free-form guidance on every reading
    pub fn text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn build(self) -> KilnPipeline {
        let engine = self
            .engine
            .unwrap_or_else(|| InferenceEngine::mock(self.config.predictor.mock_bias));
        info!(
            model = engine.model_name(),
            deg_per_pct = self.config.thermal.deg_per_pct,
            sink = self.sink.is_some(),
            generator = self.generator.is_some(),
            "Building kiln pipeline"
        );

        KilnPipeline {
            validator: Validator::new(),
            windows: WindowStore::new(),
            deriver: FeatureDeriver::new(),
            corrector: ThermalCorrector::new(self.config.thermal.deg_per_pct),
            engine,
            sink: self.sink,
            generator: self.generator,
            config: self.config,
        }
    }
}

/// Per-reading processing over shared per-sensor history
pub struct KilnPipeline {
    config: PipelineConfig,
    validator: Validator,
    windows: WindowStore,
    deriver: FeatureDeriver,
    corrector: ThermalCorrector,
    engine: InferenceEngine,
    sink: Option<Arc<dyn RecordSink>>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl KilnPipeline {
    /// Start building a pipeline
    pub fn builder(config: PipelineConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            engine: None,
            sink: None,
            generator: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Per-sensor history
    pub fn windows(&self) -> &WindowStore {
        &self.windows
    }

    /// Validate and process a raw reading for `sensor_id`
    pub async fn process(&self, sensor_id: &str, raw: &RawReading) -> Result<Outcome, PipelineError> {
        let reading = self.validator.validate(raw).map_err(|e| {
            warn!(sensor_id, "Rejected reading: {}", e);
            metrics::counter!("kiln_readings_rejected_total").increment(1);
            e
        })?;
        self.process_reading(sensor_id, reading).await
    }

    /// Process a raw reading under its own sensor id, or the default one
    pub async fn ingest(&self, raw: &RawReading) -> Result<Outcome, PipelineError> {
        let sensor_id = self.sensor_id_for(raw).to_string();
        self.process(&sensor_id, raw).await
    }

    /// Decode and process a JSON payload
    pub async fn ingest_json(&self, payload: &str) -> Result<Outcome, PipelineError> {
        let raw = self.validator.parse_json(payload).map_err(|e| {
            metrics::counter!("kiln_readings_rejected_total").increment(1);
            e
        })?;
        self.ingest(&raw).await
    }

    /// Process an already validated reading
    pub async fn process_reading(
        &self,
        sensor_id: &str,
        reading: SensorReading,
    ) -> Result<Outcome, PipelineError> {
        let result = self.run(sensor_id, reading).await;
        match &result {
            Ok(_) => metrics::counter!("kiln_readings_processed_total").increment(1),
            Err(e) => {
                warn!(sensor_id, "Rejected reading: {}", e);
                metrics::counter!("kiln_readings_rejected_total").increment(1);
            }
        }
        result
    }

    /// Validate a batch, order it by timestamp and process it in order
    ///
    /// Failures are collected per reading; the batch is never aborted.
    pub async fn replay(&self, batch: &[RawReading]) -> ReplayReport {
        let mut report = ReplayReport::default();
        let mut accepted = Vec::with_capacity(batch.len());

        for (index, raw) in batch.iter().enumerate() {
            let sensor_id = self.sensor_id_for(raw).to_string();
            match self.validator.validate(raw) {
                Ok(reading) => accepted.push((index, sensor_id, reading)),
                Err(e) => {
                    metrics::counter!("kiln_readings_rejected_total").increment(1);
                    report.failures.push(ReplayFailure {
                        index,
                        sensor_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        // Stable: equal timestamps keep their input order
        accepted.sort_by_key(|(_, _, reading)| reading.timestamp);

        for (index, sensor_id, reading) in accepted {
            match self.process_reading(&sensor_id, reading).await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => report.failures.push(ReplayFailure {
                    index,
                    sensor_id,
                    error: e.to_string(),
                }),
            }
        }

        report.failures.sort_by_key(|f| f.index);
        info!(
            processed = report.outcomes.len(),
            failed = report.failures.len(),
            "Replay finished"
        );
        report
    }

    /// Serialize a sensor's history window, counters included
    ///
    /// Unknown sensors checkpoint as an empty window.
    pub fn checkpoint(&self, sensor_id: &str) -> Result<Vec<u8>, PipelineError> {
        let window = self
            .windows
            .get(sensor_id)?
            .unwrap_or_else(|| HistoryWindow::new(sensor_id));
        Ok(window.to_bytes()?)
    }

    /// Reinstall a history window produced by [`KilnPipeline::checkpoint`]
    pub fn restore(&self, bytes: &[u8]) -> Result<String, PipelineError> {
        let window = HistoryWindow::from_bytes(bytes)?;
        let sensor_id = window.sensor_id().to_string();
        self.windows.restore(window)?;
        info!(sensor_id = %sensor_id, "Restored history window");
        Ok(sensor_id)
    }

    fn sensor_id_for<'a>(&'a self, raw: &'a RawReading) -> &'a str {
        raw.sensor_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(self.config.default_sensor_id.as_str())
    }

    async fn run(&self, sensor_id: &str, reading: SensorReading) -> Result<Outcome, PipelineError> {
        // A zero coal calorific value would make the correction undefined
        ThermalCorrector::heat_ratio(
            reading.coal_calorific,
            reading.af_calorific,
            reading.af_share_pct,
        )?;

        let features = self
            .windows
            .observe(sensor_id, reading.clone(), |current, history| {
                self.deriver
                    .derive(current, history)
                    .map_err(PipelineError::from)
            })?;
        let vector = FeatureVector::from_record(&reading, &features);
        debug!(sensor_id, timestamp = %reading.timestamp, "Derived features");

        let prediction = self.predict(sensor_id, &reading, &vector).await;

        let alerts = advisory::detect(&reading, &self.config.anomaly);
        let advice = Advice::for_reading(&reading);
        let predicted_temp = prediction.report().map(|r| r.base_prediction);
        let recommendations = advisory::strategy_recommendations(&reading, predicted_temp);
        let guidance = self.guidance(&reading, prediction.report()).await;

        let mut outcome = Outcome {
            sensor_id: sensor_id.to_string(),
            reading,
            features,
            vector,
            prediction,
            alerts,
            advice,
            recommendations,
            guidance,
            prediction_id: None,
        };
        outcome.prediction_id = self.record(&outcome);

        Ok(outcome)
    }

    async fn predict(
        &self,
        sensor_id: &str,
        reading: &SensorReading,
        vector: &FeatureVector,
    ) -> Prediction {
        let inference = match self.engine.predict(vector).await {
            Ok(inference) => inference,
            Err(e) => {
                warn!(sensor_id, "Prediction unavailable: {}", e);
                metrics::counter!("kiln_predictions_unavailable_total").increment(1);
                return Prediction::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        let input = ThermalInput {
            base_temp: inference.predicted_temp,
            coal_cv: reading.coal_calorific,
            af_cv: reading.af_calorific,
            af_pct: reading.af_share_pct,
            current_fuel_rate: reading.fuel_rate,
        };
        match self.corrector.correct(&input) {
            Ok(result) => Prediction::Available {
                model: inference.model,
                latency_ms: inference.latency_ms,
                report: CorrectionReport::new(&input, &result),
            },
            Err(e) => {
                warn!(sensor_id, "Thermal correction failed: {}", e);
                metrics::counter!("kiln_predictions_unavailable_total").increment(1);
                Prediction::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn guidance(
        &self,
        reading: &SensorReading,
        report: Option<&CorrectionReport>,
    ) -> Option<String> {
        let generator = Arc::clone(self.generator.as_ref()?);
        let reading = reading.clone();
        let report = report.cloned();

        // Generators may block on network I/O
        tokio::task::spawn_blocking(move || {
            advisory::generate_guidance(generator.as_ref(), &reading, report.as_ref())
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Text generator task failed: {}", e);
            None
        })
    }

    /// Hand the outcome to the sink; failures are logged, never propagated
    fn record(&self, outcome: &Outcome) -> Option<i64> {
        let sink = self.sink.as_ref()?;
        let now = Utc::now();

        let sensor = SensorRecord {
            sensor_id: outcome.sensor_id.clone(),
            reading: outcome.reading.clone(),
            features: outcome.features.clone(),
            created_at: now,
        };
        if let Err(e) = sink.save_sensor(&sensor) {
            warn!(sensor_id = %outcome.sensor_id, "Failed to store sensor record: {}", e);
        }

        let prediction = PredictionRecord {
            id: 0,
            sensor_id: outcome.sensor_id.clone(),
            timestamp: outcome.reading.timestamp,
            correction: outcome.prediction.report().cloned(),
            unavailable_reason: match &outcome.prediction {
                Prediction::Unavailable { reason } => Some(reason.clone()),
                Prediction::Available { .. } => None,
            },
            alerts: outcome.messages(),
            created_at: now,
        };
        match sink.save_prediction(prediction) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(sensor_id = %outcome.sensor_id, "Failed to store prediction: {}", e);
                None
            }
        }
    }
}
