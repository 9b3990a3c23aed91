//! Tracking session state machine states.
//!
//! ```text
//! Idle ──start──► RequestingPermission ──► Acquiring ──► Tracking ──stop──► Stopped
//!                        ▲                                                     │
//!                        └───────────────start─────────────── Errored ◄── any ─┘
//! ```

use std::fmt;

use serde::Serialize;

use crate::error::ErrorKind;

/// Lifecycle state of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum TrackingState {
    /// Created, never started.
    #[default]
    Idle,
    /// Waiting for the permission prompt.
    RequestingPermission,
    /// Waiting for the initial fix.
    Acquiring,
    /// Subscribed and receiving fixes.
    Tracking,
    /// Stopped by the owner.
    Stopped,
    /// Failed; `start()` retries from the permission step.
    Errored(ErrorKind),
}

impl TrackingState {
    /// Whether fixes are being received.
    pub fn is_tracking(&self) -> bool {
        matches!(self, TrackingState::Tracking)
    }

    /// Short display label.
    pub fn label(&self) -> &'static str {
        match self {
            TrackingState::Idle => "idle",
            TrackingState::RequestingPermission => "requesting-permission",
            TrackingState::Acquiring => "acquiring",
            TrackingState::Tracking => "tracking",
            TrackingState::Stopped => "stopped",
            TrackingState::Errored(_) => "errored",
        }
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingState::Errored(kind) => write!(f, "errored({})", kind),
            other => write!(f, "{}", other.label()),
        }
    }
}
