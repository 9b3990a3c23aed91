//! Tracking session.
//!
//! A [`TrackingSession`] turns a [`LocationProvider`](crate::provider::LocationProvider)
//! into a bounded, ordered track with a running distance total.
//!
//! # Lifecycle
//!
//! ```text
//!              start()                       grant            initial fix
//!   Idle ───────────────► RequestingPermission ─────► Acquiring ──────────► Tracking
//!    ▲                          │ deny                     │ timeout/error      │
//!    │                          ▼                          ▼                    │ stop()
//!    │                    Errored(permission_denied)  Errored(acquisition_failed)
//!    │                                                                          ▼
//!    └──────────────── start() from Stopped / Errored ◄────────────────── Stopped
//! ```
//!
//! # Concurrency
//!
//! The session is the only writer. Continuous fixes arrive on a channel and
//! are applied by a pump task under the model's write lock; each applied
//! fix is tagged with the subscription generation that produced it, so a
//! fix racing with `stop()` is dropped rather than recorded. Observers
//! clone snapshots out under a read lock or follow the status watch
//! channel.

mod config;
mod model;
mod pump;
mod state;
mod tracker;

pub use config::{
    SessionConfig, DEFAULT_ACQUISITION_TIMEOUT, DEFAULT_MIN_DISTANCE_M, DEFAULT_MIN_INTERVAL_MS,
};
pub use model::{TrackingObserver, TrackingStatus};
pub use state::TrackingState;
pub use tracker::TrackingSession;
