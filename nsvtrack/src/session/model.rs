//! Published session state and read-only observers.
//!
//! All mutable session state lives in one [`TrackingModel`] behind a single
//! lock. Every mutation goes through [`SharedModel::update`], which also
//! publishes a fresh [`TrackingStatus`] before releasing the lock, so readers
//! and status subscribers never see a half-applied sample.
//!
//! # Architecture
//!
//! ```text
//! session / pump ──► SharedModel::update ──► TrackingModel (RwLock)
//!                                       └──► watch::Sender<TrackingStatus>
//!                                                   │
//!                            TrackingObserver ◄─────┘ (snapshots, stream)
//! ```

use std::sync::Arc;

use futures::stream::{self, Stream};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::state::TrackingState;
use crate::accuracy::AccuracyProfile;
use crate::error::TrackingError;
use crate::history::{RejectReason, TrackHistory};
use crate::permission::AccessLevel;
use crate::position::{PositionSample, RawFix};

/// Identifier of a subscription as seen by the model.
///
/// Events tagged with a generation other than the active one are ignored;
/// this is what makes `stop()` a hard barrier.
pub(crate) type Generation = u64;

/// Mutable session state.
#[derive(Debug)]
pub(crate) struct TrackingModel {
    pub(crate) state: TrackingState,
    pub(crate) profile: AccuracyProfile,
    pub(crate) current: Option<PositionSample>,
    pub(crate) track: TrackHistory,
    pub(crate) access: AccessLevel,
    pub(crate) error: Option<String>,
    pub(crate) active_generation: Option<Generation>,
}

impl TrackingModel {
    pub(crate) fn new(profile: AccuracyProfile, track: TrackHistory) -> Self {
        Self {
            state: TrackingState::Idle,
            profile,
            current: None,
            track,
            access: AccessLevel::None,
            error: None,
            active_generation: None,
        }
    }

    /// Record a sample and make it the current location.
    pub(crate) fn record(&mut self, sample: PositionSample) -> Result<(), RejectReason> {
        self.track.record(sample)?;
        self.current = Some(sample);
        Ok(())
    }

    /// Move to `Errored` and drop the active subscription generation.
    pub(crate) fn fail(&mut self, error: &TrackingError) {
        self.state = TrackingState::Errored(error.kind());
        self.error = Some(error.to_string());
        self.active_generation = None;
    }

    fn status(&self) -> TrackingStatus {
        TrackingStatus {
            state: self.state,
            profile: self.profile,
            current_location: self.current,
            history_len: self.track.buffer().len(),
            distance_m: self.track.distance_meters(),
            access: self.access,
            error: self.error.clone(),
            rejected_samples: self.track.rejected_count(),
        }
    }
}

/// Point-in-time summary of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingStatus {
    pub state: TrackingState,
    pub profile: AccuracyProfile,
    pub current_location: Option<PositionSample>,
    pub history_len: usize,
    pub distance_m: f64,
    pub access: AccessLevel,
    pub error: Option<String>,
    pub rejected_samples: u64,
}

impl TrackingStatus {
    /// Whether fixes are being received.
    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking()
    }

    /// Whether any location access is held.
    pub fn has_permission(&self) -> bool {
        self.access.is_granted()
    }
}

/// Model plus its status publisher.
#[derive(Debug)]
pub(crate) struct SharedModel {
    model: RwLock<TrackingModel>,
    status_tx: watch::Sender<TrackingStatus>,
}

impl SharedModel {
    pub(crate) fn new(model: TrackingModel) -> Arc<Self> {
        let (status_tx, _) = watch::channel(model.status());
        Arc::new(Self {
            model: RwLock::new(model),
            status_tx,
        })
    }

    /// Mutate the model and publish the resulting status atomically.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut TrackingModel) -> R) -> R {
        let mut model = self.model.write();
        let result = f(&mut model);
        self.status_tx.send_replace(model.status());
        result
    }

    /// Read the model.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&TrackingModel) -> R) -> R {
        f(&self.model.read())
    }

    /// Apply a fix from subscription `generation`.
    ///
    /// Returns `false` when the generation is no longer active and the fix
    /// was discarded.
    pub(crate) fn apply_fix(&self, generation: Generation, fix: RawFix) -> bool {
        let sample = match PositionSample::try_from(fix) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "Discarding invalid fix");
                return true;
            }
        };

        let mut model = self.model.write();
        if model.active_generation != Some(generation) || !model.state.is_tracking() {
            trace!(generation, "Discarding fix from inactive subscription");
            return false;
        }

        match model.record(sample) {
            Ok(()) => {
                trace!(
                    lat = sample.latitude(),
                    lon = sample.longitude(),
                    "Position updated"
                );
                self.status_tx.send_replace(model.status());
            }
            Err(reason) => {
                debug!(%reason, "Fix not recorded");
                self.status_tx.send_replace(model.status());
            }
        }
        true
    }

    /// Fail subscription `generation` if it is still active.
    pub(crate) fn fail_generation(&self, generation: Generation, error: TrackingError) -> bool {
        self.update(|model| {
            if model.active_generation != Some(generation) {
                return false;
            }
            warn!(error = %error, "Subscription failed");
            model.fail(&error);
            true
        })
    }

    fn subscribe(&self) -> watch::Receiver<TrackingStatus> {
        self.status_tx.subscribe()
    }
}

/// Read-only, cloneable view of a session's published state.
///
/// Every accessor returns a consistent snapshot taken at a single instant.
#[derive(Debug, Clone)]
pub struct TrackingObserver {
    shared: Arc<SharedModel>,
}

impl TrackingObserver {
    pub(crate) fn new(shared: Arc<SharedModel>) -> Self {
        Self { shared }
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

    /// History and its distance in meters, taken under one lock.
    pub fn history_with_distance(&self) -> (Vec<PositionSample>, f64) {
        self.shared
            .read(|m| (m.track.buffer().snapshot(), m.track.distance_meters()))
    }

    /// Copy of the last `n` retained samples (oldest first).
    pub fn recent_history(&self, n: usize) -> Vec<PositionSample> {
        self.shared.read(|m| m.track.buffer().recent(n))
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

    /// Message of the last error, if the session has not recovered.
    pub fn error(&self) -> Option<String> {
        self.shared.read(|m| m.error.clone())
    }

    /// Cumulative distance over the retained history in meters.
    pub fn distance_traveled(&self) -> f64 {
        self.shared.read(|m| m.track.distance_meters())
    }

    /// Full status snapshot.
    pub fn status(&self) -> TrackingStatus {
        self.shared.read(TrackingModel::status)
    }

    /// Watch channel receiver for status changes.
    pub fn watch(&self) -> watch::Receiver<TrackingStatus> {
        self.shared.subscribe()
    }

    /// Stream of status snapshots: the current one, then one per change.
    ///
    /// Intermediate states may be coalesced if the consumer is slow. The
    /// stream ends when the session and all other observers are dropped.
    pub fn status_stream(&self) -> impl Stream<Item = TrackingStatus> + Send + 'static {
        let rx = self.watch();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let status = rx.borrow_and_update().clone();
            Some((status, (rx, false)))
        })
    }
}
