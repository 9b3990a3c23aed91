//! CLI error type.

use nsvtrack::config::ConfigError;
use nsvtrack::logging::LoggingError;
use nsvtrack::TrackingError;
use thiserror::Error;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error("Tracking ended: {0}")]
    Ended(String),

    #[error("Failed to encode status: {0}")]
    Json(#[from] serde_json::Error),
}
