//! Addressable configuration keys (`section.key`).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{invalid, parse_limit, parse_value, ConfigError, ConfigFile};
use crate::logging::parse_level;

/// A single setting in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    TrackingAccuracy,
    TrackingMinDistance,
    TrackingMinInterval,
    TrackingAcquisitionTimeout,
    FilterMaxAccuracy,
    FilterMaxSpeed,
    LoggingLevel,
    LoggingFile,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::TrackingAccuracy,
            ConfigKey::TrackingMinDistance,
            ConfigKey::TrackingMinInterval,
            ConfigKey::TrackingAcquisitionTimeout,
            ConfigKey::FilterMaxAccuracy,
            ConfigKey::FilterMaxSpeed,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingFile,
        ]
    }

    /// INI section.
    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::TrackingAccuracy
            | ConfigKey::TrackingMinDistance
            | ConfigKey::TrackingMinInterval
            | ConfigKey::TrackingAcquisitionTimeout => "tracking",
            ConfigKey::FilterMaxAccuracy | ConfigKey::FilterMaxSpeed => "filter",
            ConfigKey::LoggingLevel | ConfigKey::LoggingFile => "logging",
        }
    }

    /// Key name within its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::TrackingAccuracy => "accuracy",
            ConfigKey::TrackingMinDistance => "min_distance_m",
            ConfigKey::TrackingMinInterval => "min_interval_ms",
            ConfigKey::TrackingAcquisitionTimeout => "acquisition_timeout_secs",
            ConfigKey::FilterMaxAccuracy => "max_accuracy_m",
            ConfigKey::FilterMaxSpeed => "max_speed_mps",
            ConfigKey::LoggingLevel => "level",
            ConfigKey::LoggingFile => "file",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as written to the file. Unset values are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        match self {
            ConfigKey::TrackingAccuracy => config.tracking.accuracy.to_string(),
            ConfigKey::TrackingMinDistance => config.tracking.min_distance_m.to_string(),
            ConfigKey::TrackingMinInterval => config.tracking.min_interval_ms.to_string(),
            ConfigKey::TrackingAcquisitionTimeout => {
                config.tracking.acquisition_timeout_secs.to_string()
            }
            ConfigKey::FilterMaxAccuracy => optional(config.filter.max_accuracy_m),
            ConfigKey::FilterMaxSpeed => optional(config.filter.max_speed_mps),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validate and store `raw`.
    pub fn set(&self, config: &mut ConfigFile, raw: &str) -> Result<(), ConfigError> {
        let key = *self;
        match self {
            ConfigKey::TrackingAccuracy => {
                config.tracking.accuracy = parse_value(key, raw)?;
            }
            ConfigKey::TrackingMinDistance => {
                let meters: f64 = parse_value(key, raw)?;
                if !meters.is_finite() || meters < 0.0 {
                    return Err(invalid(key, raw, "must be zero or a positive number"));
                }
                config.tracking.min_distance_m = meters;
            }
            ConfigKey::TrackingMinInterval => {
                config.tracking.min_interval_ms = parse_value(key, raw)?;
            }
            ConfigKey::TrackingAcquisitionTimeout => {
                let secs: u64 = parse_value(key, raw)?;
                if secs == 0 {
                    return Err(invalid(key, raw, "must be at least 1 second"));
                }
                config.tracking.acquisition_timeout_secs = secs;
            }
            ConfigKey::FilterMaxAccuracy => {
                config.filter.max_accuracy_m = parse_limit(key, raw)?;
            }
            ConfigKey::FilterMaxSpeed => {
                config.filter.max_speed_mps = parse_limit(key, raw)?;
            }
            ConfigKey::LoggingLevel => {
                let level = raw.trim();
                parse_level(level).map_err(|e| invalid(key, raw, &e.to_string()))?;
                config.logging.level = level.to_lowercase();
            }
            ConfigKey::LoggingFile => {
                let path = raw.trim();
                config.logging.file = (!path.is_empty()).then(|| PathBuf::from(path));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
