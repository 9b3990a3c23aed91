//! Simulated location provider.
//!
//! Walks a straight great-circle course from a start point at constant
//! speed and emits fixes at the subscribed interval. Used by the CLI for
//! demos and by tests that need a provider with real timing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{
    FixSender, LocationProvider, ProviderError, ProviderFuture, SubscriptionHandle,
    SubscriptionParams,
};
use crate::accuracy::ProviderAccuracy;
use crate::geo::destination_point;
use crate::position::RawFix;

/// Default start point (lower Manhattan).
pub const DEFAULT_START: (f64, f64) = (40.7128, -74.0060);

/// Default walking speed in m/s.
pub const DEFAULT_SPEED_MPS: f64 = 1.4;

/// How the simulated user answers a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionAnswer {
    #[default]
    Grant,
    Deny,
    /// Access blocked by device policy.
    Restrict,
}

impl PermissionAnswer {
    fn resolve(self) -> Result<bool, ProviderError> {
        match self {
            PermissionAnswer::Grant => Ok(true),
            PermissionAnswer::Deny => Ok(false),
            PermissionAnswer::Restrict => Err(ProviderError::Restricted(
                "blocked by device policy".to_string(),
            )),
        }
    }
}

/// Configuration for the simulated provider.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Start latitude in degrees.
    pub start_lat: f64,
    /// Start longitude in degrees.
    pub start_lon: f64,
    /// Course over ground in degrees (0 = North).
    pub heading_deg: f64,
    /// Ground speed in m/s.
    pub speed_mps: f64,
    /// Answer to the foreground permission prompt.
    pub foreground: PermissionAnswer,
    /// Answer to the background permission prompt.
    pub background: PermissionAnswer,
    /// Latency of the one-shot fix.
    pub fix_delay: Duration,
    /// Make the one-shot fix fail.
    pub fail_acquisition: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            start_lat: DEFAULT_START.0,
            start_lon: DEFAULT_START.1,
            heading_deg: 45.0,
            speed_mps: DEFAULT_SPEED_MPS,
            foreground: PermissionAnswer::Grant,
            background: PermissionAnswer::Grant,
            fix_delay: Duration::ZERO,
            fail_acquisition: false,
        }
    }
}

/// Current simulated position, shared by all subscriptions.
#[derive(Debug)]
struct Walker {
    lat: f64,
    lon: f64,
    last_ts: i64,
}

impl Walker {
    fn advance(&mut self, heading_deg: f64, distance_m: f64) {
        let (lat, lon) = destination_point(self.lat, self.lon, heading_deg, distance_m);
        self.lat = lat;
        self.lon = lon;
    }

    /// Wall-clock timestamp that never runs backwards.
    fn next_timestamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_ts = self.last_ts.max(now);
        self.last_ts
    }

    fn fix(&mut self, accuracy: ProviderAccuracy, heading_deg: f64, speed_mps: f64) -> RawFix {
        let timestamp_ms = self.next_timestamp();
        RawFix::new(self.lat, self.lon, timestamp_ms)
            .with_accuracy(accuracy.nominal_radius_m())
            .with_motion(speed_mps, heading_deg)
    }
}

/// Deterministic straight-line location provider.
#[derive(Debug)]
pub struct SimulatedProvider {
    config: SimulatedConfig,
    walker: Arc<Mutex<Walker>>,
    active: Arc<AtomicUsize>,
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new(SimulatedConfig::default())
    }
}

impl SimulatedProvider {
    /// Create a provider from configuration.
    pub fn new(config: SimulatedConfig) -> Self {
        let walker = Walker {
            lat: config.start_lat,
            lon: config.start_lon,
            last_ts: 0,
        };
        Self {
            config,
            walker: Arc::new(Mutex::new(walker)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of subscriptions that have not been cancelled.
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

}

impl LocationProvider for SimulatedProvider {
    fn request_foreground_access(&self) -> ProviderFuture<'_, bool> {
        let answer = self.config.foreground;
        Box::pin(async move { answer.resolve() })
    }

    fn request_background_access(&self) -> ProviderFuture<'_, bool> {
        let answer = self.config.background;
        Box::pin(async move { answer.resolve() })
    }

    fn current_position(&self, accuracy: ProviderAccuracy) -> ProviderFuture<'_, RawFix> {
        Box::pin(async move {
            if !self.config.fix_delay.is_zero() {
                tokio::time::sleep(self.config.fix_delay).await;
            }
            if self.config.fail_acquisition {
                return Err(ProviderError::Unavailable("no satellite lock".to_string()));
            }
            let fix = self
                .walker
                .lock()
                .fix(accuracy, self.config.heading_deg, self.config.speed_mps);
            Ok(fix)
        })
    }

    fn subscribe(
        &self,
        params: SubscriptionParams,
        sink: FixSender,
    ) -> Result<Box<dyn SubscriptionHandle>, ProviderError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let token = CancellationToken::new();
        let interval = Duration::from_millis(params.min_interval_ms.max(1));
        let step_m = self.config.speed_mps * interval.as_secs_f64();
        let heading = self.config.heading_deg;
        let speed = self.config.speed_mps;
        let walker = Arc::clone(&self.walker);
        let task_token = token.clone();

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            let mut since_last_fix = 0.0;
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        // Session gone without cancelling
                        if sink.is_closed() {
                            break;
                        }
                        let fix = {
                            let mut walker = walker.lock();
                            walker.advance(heading, step_m);
                            walker.fix(params.accuracy, heading, speed)
                        };

                        since_last_fix += step_m;
                        if since_last_fix < params.min_distance_m {
                            continue;
                        }
                        since_last_fix = 0.0;

                        trace!(lat = fix.latitude, lon = fix.longitude, "Simulated fix");
                        if sink.send_fix(fix).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Simulated subscription ended");
        });

        self.active.fetch_add(1, Ordering::SeqCst);
        debug!(?params, "Simulated subscription opened");

        Ok(Box::new(SimulatedSubscription {
            token,
            active: Arc::clone(&self.active),
            cancelled: false,
        }))
    }
}

/// Handle for a simulated subscription.
struct SimulatedSubscription {
    token: CancellationToken,
    active: Arc<AtomicUsize>,
    cancelled: bool,
}

impl SubscriptionHandle for SimulatedSubscription {
    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.token.cancel();
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for SimulatedSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderEvent;

    #[tokio::test]
    async fn test_permission_answers() {
        let provider = SimulatedProvider::new(SimulatedConfig {
            foreground: PermissionAnswer::Grant,
            background: PermissionAnswer::Deny,
            ..Default::default()
        });
        assert_eq!(provider.request_foreground_access().await, Ok(true));
        assert_eq!(provider.request_background_access().await, Ok(false));

        let restricted = SimulatedProvider::new(SimulatedConfig {
            foreground: PermissionAnswer::Restrict,
            ..Default::default()
        });
        assert!(matches!(
            restricted.request_foreground_access().await,
            Err(ProviderError::Restricted(_))
        ));
    }

    #[tokio::test]
    async fn test_current_position_uses_accuracy() {
        let provider = SimulatedProvider::default();
        let fix = provider
            .current_position(ProviderAccuracy::Balanced)
            .await
            .unwrap();

        assert_eq!((fix.latitude, fix.longitude), DEFAULT_START);
        assert_eq!(fix.accuracy, Some(100.0));
        assert!(fix.timestamp_ms > 0);
    }

    #[tokio::test]
    async fn test_failed_acquisition() {
        let provider = SimulatedProvider::new(SimulatedConfig {
            fail_acquisition: true,
            ..Default::default()
        });
        let result = provider.current_position(ProviderAccuracy::High).await;
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_emits_and_cancels() {
        let provider = SimulatedProvider::new(SimulatedConfig {
            heading_deg: 0.0,
            speed_mps: 10.0,
            ..Default::default()
        });
        let (sink, mut rx) = FixSender::channel();
        let params = SubscriptionParams {
            accuracy: ProviderAccuracy::High,
            min_interval_ms: 1_000,
            min_distance_m: 1.0,
        };

        let mut handle = provider.subscribe(params, sink).unwrap();
        assert_eq!(provider.active_subscriptions(), 1);

        let first = match rx.recv().await.unwrap() {
            ProviderEvent::Fix(fix) => fix,
            other => panic!("unexpected event {:?}", other),
        };
        let second = match rx.recv().await.unwrap() {
            ProviderEvent::Fix(fix) => fix,
            other => panic!("unexpected event {:?}", other),
        };

        // Heading north: latitude increases ~10m per fix
        assert!(second.latitude > first.latitude);
        assert!(second.timestamp_ms >= first.timestamp_ms);

        handle.cancel();
        handle.cancel();
        assert_eq!(provider.active_subscriptions(), 0);

        // Task exits and drops the sender
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_distance_suppresses_fixes() {
        let provider = SimulatedProvider::new(SimulatedConfig {
            speed_mps: 1.0,
            ..Default::default()
        });
        let (sink, mut rx) = FixSender::channel();
        let params = SubscriptionParams {
            accuracy: ProviderAccuracy::High,
            min_interval_ms: 1_000,
            min_distance_m: 5.0,
        };
        let _handle = provider.subscribe(params, sink).unwrap();

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert!(rx.try_recv().is_err(), "moved only 4m, no fix expected");

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!(matches!(rx.try_recv(), Ok(ProviderEvent::Fix(_))));
    }

    #[test]
    fn test_subscribe_without_runtime_fails() {
        let provider = SimulatedProvider::default();
        let (sink, _rx) = FixSender::channel();
        let params = SubscriptionParams {
            accuracy: ProviderAccuracy::High,
            min_interval_ms: 1_000,
            min_distance_m: 1.0,
        };
        assert!(matches!(
            provider.subscribe(params, sink),
            Err(ProviderError::Unavailable(_))
        ));
        assert_eq!(provider.active_subscriptions(), 0);
    }
}
