//! Tracking session driver.
//!
//! Owns the provider subscription and drives the state machine. Observers
//! read through [`TrackingObserver`] and never touch the session itself.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::model::{Generation, SharedModel, TrackingModel, TrackingObserver, TrackingStatus};
use super::pump::{run_pump, HandleSlot};
use super::state::TrackingState;
use crate::accuracy::{AccuracyProfile, ProviderAccuracy};
use crate::error::{AcquisitionError, PermissionError, SubscriptionError, TrackingError};
use crate::history::{SampleBuffer, TrackHistory};
use crate::permission::{AccessLevel, PermissionGate, PermissionStatus};
use crate::position::PositionSample;
use crate::provider::{FixSender, LocationProvider};

/// A live provider subscription and the pump draining it.
///
/// Dropping it cancels the provider handle and stops the pump. The pump
/// itself releases the handle when the provider reports a failure.
struct ActiveSubscription {
    generation: Generation,
    handle: HandleSlot,
    token: CancellationToken,
    pump: JoinHandle<()>,
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.token.cancel();
        self.pump.abort();
        if self.handle.release() {
            debug!(generation = self.generation, "Subscription released");
        }
    }
}

/// A location tracking session.
///
/// `start` and `stop` take `&mut self`; share a session by handing out
/// [`TrackingObserver`]s rather than the session itself.
///
/// # Example
///
/// ```ignore
/// let provider = Arc::new(SimulatedProvider::default());
/// let mut session = TrackingSession::new(provider, SessionConfig::default());
///
/// session.start().await?;
/// let observer = session.observer();
/// println!("{:.1} m", observer.distance_traveled());
/// session.stop();
/// ```
pub struct TrackingSession<P: LocationProvider> {
    provider: Arc<P>,
    gate: PermissionGate<P>,
    config: SessionConfig,
    shared: Arc<SharedModel>,
    subscription: Option<ActiveSubscription>,
    next_generation: Generation,
}

impl<P: LocationProvider> fmt::Debug for TrackingSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingSession")
            .field("config", &self.config)
            .field("state", &self.state())
            .field(
                "subscription",
                &self.subscription.as_ref().map(|s| s.generation),
            )
            .finish_non_exhaustive()
    }
}

impl<P: LocationProvider> TrackingSession<P> {
    /// Create an idle session.
    pub fn new(provider: Arc<P>, config: SessionConfig) -> Self {
        let track = TrackHistory::with_parts(
            SampleBuffer::with_capacity(config.history_capacity),
            config.filter,
        );
        let shared = SharedModel::new(TrackingModel::new(config.accuracy_profile, track));

        Self {
            gate: PermissionGate::new(Arc::clone(&provider)),
            provider,
            config,
            shared,
            subscription: None,
            next_generation: 1,
        }
    }

    /// Start tracking.
    ///
    /// Requests permission, waits for an initial fix (bounded by the
    /// acquisition timeout) and opens the continuous subscription. A no-op
    /// while already tracking. On failure the session moves to
    /// `Errored(kind)` and a later call retries from the permission step.
    pub async fn start(&mut self) -> Result<TrackingState, TrackingError> {
        if self.state().is_tracking() {
            debug!("start() while tracking, ignoring");
            return Ok(TrackingState::Tracking);
        }

        self.release_subscription();
        self.shared.update(|m| {
            m.state = TrackingState::RequestingPermission;
            m.error = None;
        });
        debug!("Requesting location permission");

        let status = self.gate.request_access().await;
        self.shared.update(|m| m.access = status.access_level());
        match status {
            PermissionStatus::Granted(_) => {}
            PermissionStatus::Denied => return self.fail(PermissionError::Denied.into()),
            PermissionStatus::Restricted => return self.fail(PermissionError::Restricted.into()),
        }

        self.shared.update(|m| m.state = TrackingState::Acquiring);
        let accuracy = self.config.accuracy_policy().provider_accuracy();
        let initial = match self.acquire_initial(accuracy).await {
            Ok(sample) => sample,
            Err(e) => return self.fail(e.into()),
        };

        // Fixes pushed before the pump runs wait in the channel.
        let params = self.config.subscription_params();
        let (sink, rx) = FixSender::channel();
        let handle = match self.provider.subscribe(params, sink) {
            Ok(handle) => handle,
            Err(e) => return self.fail(SubscriptionError::Refused(e).into()),
        };

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let profile = self.config.accuracy_profile;

        self.shared.update(|m| {
            m.state = TrackingState::Tracking;
            m.profile = profile;
            m.active_generation = Some(generation);
            m.error = None;
            if let Err(reason) = m.record(initial) {
                debug!(%reason, "Initial fix not recorded");
            }
        });

        let handle = HandleSlot::new(handle);
        let token = CancellationToken::new();
        let pump = tokio::spawn(run_pump(
            Arc::clone(&self.shared),
            generation,
            rx,
            handle.clone(),
            token.clone(),
        ));
        self.subscription = Some(ActiveSubscription {
            generation,
            handle,
            token,
            pump,
        });

        info!(
            generation,
            %profile,
            accuracy = ?params.accuracy,
            interval_ms = params.min_interval_ms,
            min_distance_m = params.min_distance_m,
            lat = initial.latitude(),
            lon = initial.longitude(),
            "Tracking started"
        );
        Ok(TrackingState::Tracking)
    }

    /// Stop tracking.
    ///
    /// Synchronous and idempotent. Once this returns no further sample from
    /// the old subscription is applied. Only a `Tracking` session changes
    /// state; any other state is returned unchanged.
    pub fn stop(&mut self) -> TrackingState {
        let (was_tracking, state) = self.shared.update(|m| {
            m.active_generation = None;
            let was_tracking = m.state.is_tracking();
            if was_tracking {
                m.state = TrackingState::Stopped;
            }
            (was_tracking, m.state)
        });
        self.release_subscription();

        if was_tracking {
            info!(
                samples = self.shared.read(|m| m.track.buffer().len()),
                distance_m = self.distance_traveled(),
                "Tracking stopped"
            );
        }
        state
    }

    /// Change the accuracy profile.
    ///
    /// While tracking this performs a full stop-then-start so the new
    /// profile applies to a fresh subscription; otherwise it is only
    /// recorded for the next `start`.
    pub async fn set_accuracy_profile(
        &mut self,
        profile: AccuracyProfile,
    ) -> Result<TrackingState, TrackingError> {
        self.config.accuracy_profile = profile;
        let was_tracking = self.shared.update(|m| {
            m.profile = profile;
            m.state.is_tracking()
        });

        if !was_tracking {
            debug!(%profile, "Accuracy profile set");
            return Ok(self.state());
        }

        info!(%profile, "Accuracy profile changed, restarting subscription");
        self.stop();
        self.start().await
    }

    /// Empty the history. Current location and state are kept.
    pub fn clear_history(&self) {
        self.shared.update(|m| m.track.clear());
        debug!("History cleared");
    }

    /// Ask for location permission without starting.
    ///
    /// Updates `has_permission()` and `error()` only.
    pub async fn request_permissions(&mut self) -> PermissionStatus {
        let status = self.gate.request_access().await;
        let error = match status {
            PermissionStatus::Granted(_) => None,
            PermissionStatus::Denied => Some(PermissionError::Denied.to_string()),
            PermissionStatus::Restricted => Some(PermissionError::Restricted.to_string()),
        };
        self.shared.update(|m| {
            m.access = status.access_level();
            m.error = error;
        });
        status
    }

    /// Read-only view for other tasks.
    pub fn observer(&self) -> TrackingObserver {
        TrackingObserver::new(Arc::clone(&self.shared))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TrackingState {
        self.shared.read(|m| m.state)
    }

    /// Most recent accepted sample.
    pub fn current_location(&self) -> Option<PositionSample> {
        self.shared.read(|m| m.current)
    }

    /// Copy of the retained history (oldest first).
    pub fn history(&self) -> Vec<PositionSample> {
        self.shared.read(|m| m.track.buffer().snapshot())
    }

    /// Whether fixes are being received.
    pub fn is_tracking(&self) -> bool {
        self.state().is_tracking()
    }

    /// Whether any location access is held.
    pub fn has_permission(&self) -> bool {
        self.access_level().is_granted()
    }

    /// Level of location access held.
    pub fn access_level(&self) -> AccessLevel {
        self.shared.read(|m| m.access)
    }

    /// Message of the last error.
    pub fn error(&self) -> Option<String> {
        self.shared.read(|m| m.error.clone())
    }

    /// Cumulative distance over the retained history in meters.
    pub fn distance_traveled(&self) -> f64 {
        self.shared.read(|m| m.track.distance_meters())
    }

    /// Full status snapshot.
    pub fn status(&self) -> TrackingStatus {
        self.observer().status()
    }

    /// Active configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn acquire_initial(
        &self,
        accuracy: ProviderAccuracy,
    ) -> Result<PositionSample, AcquisitionError> {
        let timeout = self.config.acquisition_timeout;
        let raw = tokio::time::timeout(timeout, self.provider.current_position(accuracy))
            .await
            .map_err(|_| AcquisitionError::Timeout(timeout))?
            .map_err(AcquisitionError::Provider)?;
        Ok(PositionSample::try_from(raw)?)
    }

    fn fail(&mut self, error: TrackingError) -> Result<TrackingState, TrackingError> {
        warn!(kind = %error.kind(), error = %error, "Tracking failed");
        self.shared.update(|m| m.fail(&error));
        self.release_subscription();
        Err(error)
    }

    fn release_subscription(&mut self) {
        // Drop impl does the teardown
        self.subscription.take();
    }
}

impl<P: LocationProvider> Drop for TrackingSession<P> {
    fn drop(&mut self) {
        self.shared.update(|m| {
            m.active_generation = None;
            if m.state.is_tracking() {
                m.state = TrackingState::Stopped;
            }
        });
        self.release_subscription();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::error::ErrorKind;
    use crate::position::RawFix;
    use crate::provider::{ProviderError, ProviderFuture, SubscriptionHandle, SubscriptionParams};

    struct MockHandle {
        cancelled: Arc<AtomicUsize>,
        done: bool,
    }

    impl SubscriptionHandle for MockHandle {
        fn cancel(&mut self) {
            if !self.done {
                self.done = true;
                self.cancelled.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Provider whose answers are set by the test and whose sinks are kept.
    struct MockProvider {
        grant: AtomicBool,
        initial: Mutex<Result<RawFix, ProviderError>>,
        hang: AtomicBool,
        refuse: AtomicBool,
        sinks: Mutex<Vec<(SubscriptionParams, FixSender)>>,
        cancelled: Arc<AtomicUsize>,
    }

    impl MockProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                grant: AtomicBool::new(true),
                initial: Mutex::new(Ok(RawFix::new(40.0, -74.0, 1_000))),
                hang: AtomicBool::new(false),
                refuse: AtomicBool::new(false),
                sinks: Mutex::new(Vec::new()),
                cancelled: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn last_sink(&self) -> FixSender {
            self.sinks.lock().last().unwrap().1.clone()
        }
    }

    impl LocationProvider for MockProvider {
        fn request_foreground_access(&self) -> ProviderFuture<'_, bool> {
            let grant = self.grant.load(Ordering::SeqCst);
            Box::pin(async move { Ok(grant) })
        }

        fn request_background_access(&self) -> ProviderFuture<'_, bool> {
            Box::pin(async { Ok(false) })
        }

        fn current_position(&self, _accuracy: ProviderAccuracy) -> ProviderFuture<'_, RawFix> {
            Box::pin(async move {
                if self.hang.load(Ordering::SeqCst) {
                    std::future::pending::<()>().await;
                }
                self.initial.lock().clone()
            })
        }

        fn subscribe(
            &self,
            params: SubscriptionParams,
            sink: FixSender,
        ) -> Result<Box<dyn SubscriptionHandle>, ProviderError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(ProviderError::Failed("busy".to_string()));
            }
            self.sinks.lock().push((params, sink));
            Ok(Box::new(MockHandle {
                cancelled: Arc::clone(&self.cancelled),
                done: false,
            }))
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_start_records_initial_fix() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        assert_eq!(session.start().await.unwrap(), TrackingState::Tracking);

        let current = session.current_location().unwrap();
        assert_eq!(current.latitude(), 40.0);
        assert_eq!(current.longitude(), -74.0);
        assert_eq!(session.history(), vec![current]);
        assert_eq!(session.access_level(), AccessLevel::ForegroundOnly);
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_start_is_noop_while_tracking() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        session.start().await.unwrap();
        session.start().await.unwrap();

        assert_eq!(provider.sinks.lock().len(), 1);
        assert_eq!(session.history().len(), 1);
    }

    #[tokio::test]
    async fn test_continuous_fixes_are_recorded() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());
        session.start().await.unwrap();

        let sink = provider.last_sink();
        sink.send_fix(RawFix::new(40.0, -73.999, 2_000)).unwrap();
        sink.send_fix(RawFix::new(40.0, -73.998, 3_000)).unwrap();
        settle().await;

        assert_eq!(session.history().len(), 3);
        assert_eq!(session.current_location().unwrap().longitude(), -73.998);
        assert!(session.distance_traveled() > 150.0);
    }

    #[tokio::test]
    async fn test_stop_discards_queued_fixes() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());
        session.start().await.unwrap();

        let sink = provider.last_sink();
        // Queued but not yet drained by the pump
        let _ = sink.send_fix(RawFix::new(41.0, -74.0, 2_000));
        assert_eq!(session.stop(), TrackingState::Stopped);
        let _ = sink.send_fix(RawFix::new(42.0, -74.0, 3_000));
        settle().await;

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.current_location().unwrap().latitude(), 40.0);
        assert_eq!(provider.cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_keeps_non_tracking_state() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        assert_eq!(session.stop(), TrackingState::Idle);

        session.start().await.unwrap();
        assert_eq!(session.stop(), TrackingState::Stopped);
        assert_eq!(session.stop(), TrackingState::Stopped);
        assert_eq!(provider.cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permission_denied_then_retry() {
        let provider = MockProvider::new();
        provider.grant.store(false, Ordering::SeqCst);
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        let err = session.start().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert_eq!(
            session.state(),
            TrackingState::Errored(ErrorKind::PermissionDenied)
        );
        assert!(!session.is_tracking());
        assert!(!session.has_permission());
        assert_eq!(session.error().as_deref(), Some("Location permission denied"));

        provider.grant.store(true, Ordering::SeqCst);
        session.start().await.unwrap();
        assert!(session.is_tracking());
        assert!(session.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquisition_timeout() {
        let provider = MockProvider::new();
        provider.hang.store(true, Ordering::SeqCst);
        let config = SessionConfig::default().with_acquisition_timeout(Duration::from_secs(2));
        let mut session = TrackingSession::new(Arc::clone(&provider), config);

        let err = session.start().await.unwrap_err();
        assert!(matches!(
            err,
            TrackingError::Acquisition(AcquisitionError::Timeout(_))
        ));
        assert_eq!(
            session.state(),
            TrackingState::Errored(ErrorKind::AcquisitionFailed)
        );
        assert!(provider.sinks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_initial_fix() {
        let provider = MockProvider::new();
        *provider.initial.lock() = Ok(RawFix::new(91.0, 0.0, 0));
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        let err = session.start().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AcquisitionFailed);
        assert!(session.current_location().is_none());
    }

    #[tokio::test]
    async fn test_subscription_refused() {
        let provider = MockProvider::new();
        provider.refuse.store(true, Ordering::SeqCst);
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        let err = session.start().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SubscriptionLost);
        assert!(session.error().unwrap().starts_with("Tracking error:"));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_subscription_lost() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());
        session.start().await.unwrap();

        provider.last_sink().send_lost("location services off").unwrap();
        settle().await;

        assert_eq!(
            session.state(),
            TrackingState::Errored(ErrorKind::SubscriptionLost)
        );
        assert!(session.error().unwrap().contains("location services off"));
        // History survives the failure
        assert_eq!(session.history().len(), 1);
        // The provider handle is released without waiting for stop()
        assert_eq!(provider.cancelled.load(Ordering::SeqCst), 1);

        assert_eq!(
            session.stop(),
            TrackingState::Errored(ErrorKind::SubscriptionLost)
        );
        assert_eq!(provider.cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_accuracy_profile_restarts() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());
        session.start().await.unwrap();
        let old_sink = provider.last_sink();

        let state = session
            .set_accuracy_profile(AccuracyProfile::Low)
            .await
            .unwrap();

        assert_eq!(state, TrackingState::Tracking);
        assert_eq!(session.status().profile, AccuracyProfile::Low);
        let sinks = provider.sinks.lock();
        assert_eq!(sinks.len(), 2);
        assert_eq!(sinks[1].0.accuracy, ProviderAccuracy::Low);
        drop(sinks);
        assert_eq!(provider.cancelled.load(Ordering::SeqCst), 1);

        // The old subscription no longer feeds the session
        let _ = old_sink.send_fix(RawFix::new(10.0, 10.0, 5_000));
        settle().await;
        assert!(session
            .history()
            .iter()
            .all(|s| s.latitude() != 10.0));
    }

    #[tokio::test]
    async fn test_set_accuracy_profile_while_idle() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        let state = session
            .set_accuracy_profile(AccuracyProfile::Balanced)
            .await
            .unwrap();

        assert_eq!(state, TrackingState::Idle);
        assert_eq!(session.config().accuracy_profile, AccuracyProfile::Balanced);
        assert!(provider.sinks.lock().is_empty());
    }

    #[tokio::test]
    async fn test_clear_history_keeps_current_and_state() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());
        session.start().await.unwrap();

        session.clear_history();

        assert!(session.history().is_empty());
        assert_eq!(session.distance_traveled(), 0.0);
        assert!(session.current_location().is_some());
        assert!(session.is_tracking());
    }

    #[tokio::test]
    async fn test_request_permissions_does_not_start() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());

        let status = session.request_permissions().await;

        assert_eq!(status, PermissionStatus::Granted(AccessLevel::ForegroundOnly));
        assert!(session.has_permission());
        assert_eq!(session.state(), TrackingState::Idle);
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let provider = MockProvider::new();
        let mut session = TrackingSession::new(Arc::clone(&provider), SessionConfig::default());
        session.start().await.unwrap();
        let observer = session.observer();

        drop(session);

        assert_eq!(provider.cancelled.load(Ordering::SeqCst), 1);
        assert_eq!(observer.state(), TrackingState::Stopped);
    }
}
