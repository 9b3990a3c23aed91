//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use nsvtrack::config::{config_file_path, ConfigFile};
use nsvtrack::AccuracyProfile;

use crate::error::CliError;

/// Accuracy profile selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProfileArg {
    /// Best precision, highest power draw
    High,
    /// Roughly 100 m precision
    Balanced,
    /// Coarse, city-block precision
    Low,
}

impl From<ProfileArg> for AccuracyProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::High => AccuracyProfile::High,
            ProfileArg::Balanced => AccuracyProfile::Balanced,
            ProfileArg::Low => AccuracyProfile::Low,
        }
    }
}

/// Config file to use: `--config` if given, otherwise the default location.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    cli_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Load the configuration, falling back to defaults when the file is absent.
pub fn load_config(cli_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&resolve_config_path(cli_path))?)
}

/// Format meters for display.
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.1} m", meters)
    }
}
