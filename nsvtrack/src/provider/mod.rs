//! Location provider abstraction.
//!
//! The tracking session never talks to a sensor directly. It consumes a
//! [`LocationProvider`], which answers permission requests, produces one-shot
//! fixes and pushes continuous fixes into a channel owned by the session.
//!
//! # Delivery
//!
//! ```text
//! Provider ──► FixSender ──(mpsc)──► session pump ──► TrackHistory / snapshot
//!    ▲                                                     │
//!    └────────────── SubscriptionHandle::cancel ◄── stop() ┘
//! ```
//!
//! Providers are free to call [`FixSender::send_fix`] from any thread or
//! callback; sending never blocks.
//!
//! # Design Principles
//!
//! - **Dyn-compatible**: async operations return [`ProviderFuture`]
//! - **Push, not poll**: the session never waits for a continuous fix
//! - **Explicit teardown**: every subscription is released via its handle

mod simulated;

pub use simulated::{PermissionAnswer, SimulatedConfig, SimulatedProvider};

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::accuracy::ProviderAccuracy;
use crate::position::RawFix;

/// Boxed future returned by provider operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Errors reported by a location provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Access cannot be granted on this device (policy, parental controls).
    #[error("Location access restricted: {0}")]
    Restricted(String),

    /// Location services are switched off or missing.
    #[error("Location services unavailable: {0}")]
    Unavailable(String),

    /// The provider gave up waiting for the sensor.
    #[error("Location provider timed out")]
    Timeout,

    /// Any other provider failure.
    #[error("Location provider failure: {0}")]
    Failed(String),
}

/// Parameters for a continuous subscription.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriptionParams {
    /// Provider accuracy level.
    pub accuracy: ProviderAccuracy,
    /// Minimum time between fixes in milliseconds.
    pub min_interval_ms: u64,
    /// Minimum movement between fixes in meters.
    pub min_distance_m: f64,
}

/// Event pushed by a provider on an active subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// A new position fix.
    Fix(RawFix),
    /// The provider ended the subscription on its own.
    Lost(String),
}

/// Sending half of a subscription channel, handed to the provider.
#[derive(Debug, Clone)]
pub struct FixSender {
    tx: mpsc::UnboundedSender<ProviderEvent>,
}

/// The session side of the subscription channel is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Subscription channel closed")]
pub struct ChannelClosed;

impl FixSender {
    /// Create a sender and the matching receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Deliver a fix. Fails once the subscription has been torn down.
    pub fn send_fix(&self, fix: RawFix) -> Result<(), ChannelClosed> {
        self.tx.send(ProviderEvent::Fix(fix)).map_err(|_| ChannelClosed)
    }

    /// Report that the provider ended the subscription.
    pub fn send_lost(&self, reason: impl Into<String>) -> Result<(), ChannelClosed> {
        self.tx
            .send(ProviderEvent::Lost(reason.into()))
            .map_err(|_| ChannelClosed)
    }

    /// Whether the session has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Handle to an active provider subscription.
///
/// `cancel` must be idempotent. After it returns the provider should stop
/// sending; the session discards anything that still arrives.
pub trait SubscriptionHandle: Send + Sync {
    /// Release the subscription.
    fn cancel(&mut self);
}

/// External source of position fixes and permission decisions.
pub trait LocationProvider: Send + Sync + 'static {
    /// Ask for foreground access. `Ok(false)` means the user declined.
    fn request_foreground_access(&self) -> ProviderFuture<'_, bool>;

    /// Ask for background access. `Ok(false)` means the user declined.
    fn request_background_access(&self) -> ProviderFuture<'_, bool>;

    /// Produce a single fix at the given accuracy.
    fn current_position(&self, accuracy: ProviderAccuracy) -> ProviderFuture<'_, RawFix>;

    /// Start pushing fixes into `sink` until the returned handle is cancelled.
    fn subscribe(
        &self,
        params: SubscriptionParams,
        sink: FixSender,
    ) -> Result<Box<dyn SubscriptionHandle>, ProviderError>;
}
