//! Location permission gate.
//!
//! Authorization is asked for on every session start instead of being cached,
//! since the user can revoke it between sessions. Foreground access is
//! requested first; background access is then requested on top of it, and
//! a refusal there degrades the grant to foreground-only rather than failing.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::provider::{LocationProvider, ProviderError};

/// Level of location access currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No access (never asked, denied or restricted).
    #[default]
    None,
    /// Foreground only; tracking works while the app is active.
    ForegroundOnly,
    /// Foreground and background.
    Full,
}

impl AccessLevel {
    /// Whether any location access is held.
    pub fn is_granted(&self) -> bool {
        !matches!(self, AccessLevel::None)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessLevel::None => "none",
            AccessLevel::ForegroundOnly => "foreground-only",
            AccessLevel::Full => "full",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// Access granted at the given level.
    Granted(AccessLevel),
    /// The user declined.
    Denied,
    /// The device does not allow the request.
    Restricted,
}

impl PermissionStatus {
    /// Access level implied by this status.
    pub fn access_level(&self) -> AccessLevel {
        match self {
            PermissionStatus::Granted(level) => *level,
            PermissionStatus::Denied | PermissionStatus::Restricted => AccessLevel::None,
        }
    }
}

/// Requests and reports location authorization through a provider.
pub struct PermissionGate<P> {
    provider: Arc<P>,
}

impl<P> fmt::Debug for PermissionGate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionGate").finish_non_exhaustive()
    }
}

impl<P: LocationProvider> PermissionGate<P> {
    /// Create a gate backed by a provider.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Ask the provider for access.
    ///
    /// Provider failures on the foreground request count as a denial; on
    /// the background request they only lose the background part.
    pub async fn request_access(&self) -> PermissionStatus {
        match self.provider.request_foreground_access().await {
            Ok(true) => {}
            Ok(false) => {
                info!("Foreground location permission denied");
                return PermissionStatus::Denied;
            }
            Err(ProviderError::Restricted(reason)) => {
                info!(%reason, "Location permission restricted");
                return PermissionStatus::Restricted;
            }
            Err(e) => {
                warn!(error = %e, "Foreground permission request failed");
                return PermissionStatus::Denied;
            }
        }

        let level = match self.provider.request_background_access().await {
            Ok(true) => AccessLevel::Full,
            Ok(false) => {
                info!("Background location denied, continuing foreground-only");
                AccessLevel::ForegroundOnly
            }
            Err(e) => {
                warn!(error = %e, "Background permission request failed, continuing foreground-only");
                AccessLevel::ForegroundOnly
            }
        };

        debug!(%level, "Location permission granted");
        PermissionStatus::Granted(level)
    }
}
