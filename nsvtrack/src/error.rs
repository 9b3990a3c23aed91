//! Tracking error types.
//!
//! Every error is non-fatal: the session records it, moves to
//! `Errored(kind)` and stays callable.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::position::SampleError;
use crate::provider::ProviderError;

/// Stable reason code carried by `TrackingState::Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Location access denied or restricted.
    PermissionDenied,
    /// The initial fix could not be obtained.
    AcquisitionFailed,
    /// The continuous subscription could not be opened or was lost.
    SubscriptionLost,
}

impl ErrorKind {
    /// Machine-readable reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::AcquisitionFailed => "acquisition_failed",
            ErrorKind::SubscriptionLost => "subscription_lost",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location authorization was not obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    #[error("Location permission denied")]
    Denied,

    #[error("Location permission restricted on this device")]
    Restricted,
}

/// The initial one-shot fix failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    #[error("Timed out after {0:?} waiting for initial fix")]
    Timeout(Duration),

    #[error("Initial fix failed: {0}")]
    Provider(#[source] ProviderError),

    #[error("Initial fix invalid: {0}")]
    InvalidFix(#[from] SampleError),
}

/// The continuous subscription failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("Provider refused subscription: {0}")]
    Refused(#[source] ProviderError),

    #[error("Subscription lost: {0}")]
    Lost(String),

    #[error("Provider closed the subscription")]
    Closed,
}

/// Any error surfaced by a tracking session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("Tracking error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Tracking error: {0}")]
    Subscription(#[from] SubscriptionError),
}

impl TrackingError {
    /// Reason code for the `Errored` state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackingError::Permission(_) => ErrorKind::PermissionDenied,
            TrackingError::Acquisition(_) => ErrorKind::AcquisitionFailed,
            TrackingError::Subscription(_) => ErrorKind::SubscriptionLost,
        }
    }
}
