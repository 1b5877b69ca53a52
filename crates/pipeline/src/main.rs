//! Kiln Replay - replays a JSON-lines file of readings through the pipeline

use anyhow::{anyhow, bail, Context, Result};
use data_validator::{RawReading, Validator};
use pipeline::{init_logging, KilnPipeline, PipelineConfig};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use storage::Repository;
use tracing::{info, warn};

const USAGE: &str = "Usage: kiln-replay [--config <file.toml>] <readings.jsonl>";

struct ReplayOptions {
    config_path: Option<PathBuf>,
    input_path: PathBuf,
}

fn parse_args() -> Result<ReplayOptions> {
    let mut config_path = None;
    let mut input_path = None;
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => bail!(USAGE),
            _ => {
                if input_path.is_some() {
                    bail!(USAGE);
                }
                input_path = Some(PathBuf::from(arg));
            }
        }
    }

    Ok(ReplayOptions {
        config_path,
        input_path: input_path.ok_or_else(|| anyhow!(USAGE))?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = parse_args()?;
    let config = PipelineConfig::load(opts.config_path.as_deref())
        .context("failed to load configuration")?;
    init_logging(&config.logging.level, config.logging.json)?;

    info!("=== Kiln Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let text = std::fs::read_to_string(&opts.input_path)
        .with_context(|| format!("failed to read {}", opts.input_path.display()))?;

    let validator = Validator::new();
    let mut batch: Vec<RawReading> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match validator.parse_json(line) {
            Ok(raw) => batch.push(raw),
            Err(e) => warn!("Skipping line {}: {}", line_no + 1, e),
        }
    }

    let repository = Arc::new(Repository::with_retention(
        config.storage.max_sensor_records,
        config.storage.max_prediction_records,
    ));
    let pipeline = KilnPipeline::builder(config)
        .sink(repository.clone())
        .build();

    let report = pipeline.replay(&batch).await;
    for outcome in &report.outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }
    for failure in &report.failures {
        eprintln!(
            "reading {} ({}): {}",
            failure.index, failure.sensor_id, failure.error
        );
    }

    info!(
        readings = batch.len(),
        processed = report.outcomes.len(),
        failed = report.failures.len(),
        stored_predictions = repository.prediction_count(),
        "Replay complete"
    );

    Ok(())
}
