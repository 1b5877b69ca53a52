//! Logging Setup

use crate::PipelineError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
///
/// Installs the global subscriber; fails if one is already set or the level
/// is not recognised.
pub fn init_logging(level: &str, json: bool) -> Result<(), PipelineError> {
    let level: Level = level
        .trim()
        .parse()
        .map_err(|_| PipelineError::Logging(format!("unknown log level `{}`", level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    installed.map_err(|e| PipelineError::Logging(e.to_string()))
}
