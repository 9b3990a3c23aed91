//! INI configuration file.
//!
//! Settings live in `<config dir>/nsvtrack/config.ini`:
//!
//! ```ini
//! [tracking]
//! accuracy = high
//! min_distance_m = 1
//! min_interval_ms = 1000
//! acquisition_timeout_secs = 15
//!
//! [filter]
//! max_accuracy_m =
//! max_speed_mps =
//!
//! [logging]
//! level = info
//! file =
//! ```
//!
//! A missing file or key falls back to the built-in default. Empty filter
//! values leave that check disabled.

mod keys;

pub use keys::ConfigKey;

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use crate::accuracy::AccuracyProfile;
use crate::history::SampleFilter;
use crate::logging::LoggingConfig;
use crate::session::{
    SessionConfig, DEFAULT_ACQUISITION_TIMEOUT, DEFAULT_MIN_DISTANCE_M, DEFAULT_MIN_INTERVAL_MS,
};

/// Errors reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ini::ParseError),

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Path of the user's configuration file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("nsvtrack")
        .join("config.ini")
}

/// `[tracking]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSettings {
    pub accuracy: AccuracyProfile,
    pub min_distance_m: f64,
    pub min_interval_ms: u64,
    pub acquisition_timeout_secs: u64,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            accuracy: AccuracyProfile::default(),
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            acquisition_timeout_secs: DEFAULT_ACQUISITION_TIMEOUT.as_secs(),
        }
    }
}

/// `[filter]` section. `None` disables a check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSettings {
    pub max_accuracy_m: Option<f64>,
    pub max_speed_mps: Option<f64>,
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub tracking: TrackingSettings,
    pub filter: FilterSettings,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Load from `path`, or defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    /// Save to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    /// Session configuration implied by this file.
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            accuracy_profile: self.tracking.accuracy,
            min_distance_meters: self.tracking.min_distance_m,
            min_interval_ms: self.tracking.min_interval_ms,
            acquisition_timeout: Duration::from_secs(self.tracking.acquisition_timeout_secs),
            filter: SampleFilter {
                max_accuracy_m: self.filter.max_accuracy_m,
                max_speed_mps: self.filter.max_speed_mps,
            },
            ..SessionConfig::default()
        }
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            ini.with_section(Some(key.section()))
                .set(key.key_name(), key.get(self));
        }
        ini
    }
}

/// Parse a required value.
fn parse_value<T>(key: ConfigKey, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.name(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a strictly positive, finite limit. Empty means unset.
fn parse_limit(key: ConfigKey, raw: &str) -> Result<Option<f64>, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let value: f64 = parse_value(key, raw)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(key, raw, "must be a positive number"));
    }
    Ok(Some(value))
}

fn invalid(key: ConfigKey, raw: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.name(),
        value: raw.to_string(),
        reason: reason.to_string(),
    }
}
