//! Sampling precision and power profile.
//!
//! The session only ever talks in terms of an [`AccuracyProfile`]. The
//! [`AccuracyPolicy`] maps it to the provider's own accuracy levels at the
//! moment the session acquires a fix or opens a subscription, so the initial
//! fix and the continuous stream always use the same provider accuracy.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Desired precision/power tradeoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyProfile {
    /// Best available precision, highest power draw.
    #[default]
    High,
    /// Block-level precision for general tracking.
    Balanced,
    /// Coarse precision, lowest power draw.
    Low,
}

impl AccuracyProfile {
    /// All profiles in descending precision.
    pub const ALL: [AccuracyProfile; 3] = [
        AccuracyProfile::High,
        AccuracyProfile::Balanced,
        AccuracyProfile::Low,
    ];

    /// Config/CLI name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyProfile::High => "high",
            AccuracyProfile::Balanced => "balanced",
            AccuracyProfile::Low => "low",
        }
    }
}

impl fmt::Display for AccuracyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unknown accuracy profile name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown accuracy profile '{0}' (expected high, balanced or low)")]
pub struct ParseProfileError(pub String);

impl FromStr for AccuracyProfile {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(AccuracyProfile::High),
            "balanced" => Ok(AccuracyProfile::Balanced),
            "low" => Ok(AccuracyProfile::Low),
            _ => Err(ParseProfileError(s.to_string())),
        }
    }
}

/// Accuracy levels understood by location providers.
///
/// Mirrors the granularity mobile platforms expose; providers map these to
/// their own sensor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderAccuracy {
    /// ~3 km.
    Lowest,
    /// ~1 km.
    Low,
    /// ~100 m.
    Balanced,
    /// ~10 m.
    High,
    /// Best the hardware can do.
    Highest,
}

impl ProviderAccuracy {
    /// Nominal horizontal accuracy radius in meters.
    pub fn nominal_radius_m(&self) -> f64 {
        match self {
            ProviderAccuracy::Lowest => 3_000.0,
            ProviderAccuracy::Low => 1_000.0,
            ProviderAccuracy::Balanced => 100.0,
            ProviderAccuracy::High => 10.0,
            ProviderAccuracy::Highest => 3.0,
        }
    }
}

/// Holds the active profile and maps it for the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccuracyPolicy {
    profile: AccuracyProfile,
}

impl AccuracyPolicy {
    /// Create a policy for a profile.
    pub fn new(profile: AccuracyProfile) -> Self {
        Self { profile }
    }

    /// The active profile.
    pub fn profile(&self) -> AccuracyProfile {
        self.profile
    }

    /// Provider accuracy for the active profile.
    pub fn provider_accuracy(&self) -> ProviderAccuracy {
        match self.profile {
            AccuracyProfile::High => ProviderAccuracy::High,
            AccuracyProfile::Balanced => ProviderAccuracy::Balanced,
            AccuracyProfile::Low => ProviderAccuracy::Low,
        }
    }
}
