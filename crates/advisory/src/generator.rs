//! Strategy Text

use history_window::SensorReading;
use thermal_correction::CorrectionReport;
use thiserror::Error;
use tracing::warn;

const FEED_PRE_ADJUST_TEMP: f64 = 1160.0;
const HIGH_EMISSIONS: f64 = 400.0;

/// Advisory errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdvisoryError {
    #[error("Text generator unavailable: {0}")]
    Unavailable(String),

    #[error("Text generator returned an empty response")]
    EmptyResponse,
}

/// Hosted text model producing free-form operator guidance
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, AdvisoryError>;
}

impl<F> TextGenerator for F
where
    F: Fn(&str) -> Result<String, AdvisoryError> + Send + Sync,
{
    fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        self(prompt)
    }
}

/// Fixed strategy lines for a reading and its predicted temperature
pub fn strategy_recommendations(reading: &SensorReading, predicted_temp: Option<f64>) -> Vec<String> {
    let mut recommendations = Vec::new();
    if reading.emissions > HIGH_EMISSIONS {
        recommendations.push("Consider alternative fuel blend to reduce emissions".to_string());
    }
    if predicted_temp.map_or(false, |t| t > FEED_PRE_ADJUST_TEMP) {
        recommendations.push("Pre-adjust feed rate to stabilize kiln temperature".to_string());
    }
    recommendations
}

/// Prompt describing the current kiln state
pub fn build_prompt(reading: &SensorReading, report: Option<&CorrectionReport>) -> String {
    let mut prompt = format!(
        "Cement kiln at {}: kiln temperature {:.1} C, motor load {:.1}%, fuel rate {:.1}, \
         feeder rate {:.1}, emissions {:.1} ppm, alternative fuel share {:.1}%.",
        reading.timestamp.to_rfc3339(),
        reading.kiln_temp,
        reading.motor_load,
        reading.fuel_rate,
        reading.feeder_rate,
        reading.emissions,
        reading.af_share_pct,
    );

    match report {
        Some(report) => prompt.push_str(&format!(
            " Predicted temperature {:.2} C, corrected for fuel mix {:.2} C; \
             fuel rate needed to hold heat input {:.2} ({:+.2}).",
            report.base_prediction,
            report.adjusted_prediction,
            report.required_fuel_rate,
            report.fuel_rate_delta,
        )),
        None => prompt.push_str(" No temperature prediction is available."),
    }

    prompt.push_str(" Suggest concise operational adjustments for quality and emissions.");
    prompt
}

/// Ask the generator for guidance; failures are logged and yield nothing
pub fn generate_guidance(
    generator: &dyn TextGenerator,
    reading: &SensorReading,
    report: Option<&CorrectionReport>,
) -> Option<String> {
    match generator.generate(&build_prompt(reading, report)) {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Ok(_) => {
            warn!("{}", AdvisoryError::EmptyResponse);
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}
