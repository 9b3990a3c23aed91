//! Session configuration.

use std::time::Duration;

use crate::accuracy::{AccuracyPolicy, AccuracyProfile};
use crate::history::{SampleFilter, HISTORY_CAPACITY};
use crate::provider::SubscriptionParams;

/// Default minimum time between continuous fixes (1 Hz).
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1_000;

/// Default minimum movement between continuous fixes.
pub const DEFAULT_MIN_DISTANCE_M: f64 = 1.0;

/// Default bound on the initial one-shot acquisition.
pub const DEFAULT_ACQUISITION_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for a tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Desired precision/power profile.
    pub accuracy_profile: AccuracyProfile,
    /// Minimum movement between fixes in meters.
    pub min_distance_meters: f64,
    /// Minimum time between fixes in milliseconds.
    pub min_interval_ms: u64,
    /// Upper bound for the initial fix.
    pub acquisition_timeout: Duration,
    /// Optional noise rejection (unfiltered by default).
    pub filter: SampleFilter,
    /// History capacity.
    pub history_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            accuracy_profile: AccuracyProfile::default(),
            min_distance_meters: DEFAULT_MIN_DISTANCE_M,
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            acquisition_timeout: DEFAULT_ACQUISITION_TIMEOUT,
            filter: SampleFilter::default(),
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Set the accuracy profile.
    pub fn with_profile(mut self, profile: AccuracyProfile) -> Self {
        self.accuracy_profile = profile;
        self
    }

    /// Set the acquisition timeout.
    pub fn with_acquisition_timeout(mut self, timeout: Duration) -> Self {
        self.acquisition_timeout = timeout;
        self
    }

    /// Set the sample filter.
    pub fn with_filter(mut self, filter: SampleFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Accuracy policy for the configured profile.
    pub fn accuracy_policy(&self) -> AccuracyPolicy {
        AccuracyPolicy::new(self.accuracy_profile)
    }

    /// Provider subscription parameters.
    pub fn subscription_params(&self) -> SubscriptionParams {
        SubscriptionParams {
            accuracy: self.accuracy_policy().provider_accuracy(),
            min_interval_ms: self.min_interval_ms,
            min_distance_m: self.min_distance_meters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy::ProviderAccuracy;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.accuracy_profile, AccuracyProfile::High);
        assert_eq!(config.min_interval_ms, 1_000);
        assert_eq!(config.min_distance_meters, 1.0);
        assert_eq!(config.history_capacity, 1_000);
        assert!(!config.filter.is_enabled());
    }

    #[test]
    fn test_subscription_params_follow_profile() {
        let config = SessionConfig::default().with_profile(AccuracyProfile::Low);
        let params = config.subscription_params();
        assert_eq!(params.accuracy, ProviderAccuracy::Low);
        assert_eq!(params.min_interval_ms, DEFAULT_MIN_INTERVAL_MS);
        assert_eq!(params.min_distance_m, DEFAULT_MIN_DISTANCE_M);
    }
}
