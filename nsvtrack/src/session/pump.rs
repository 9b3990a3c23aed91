//! Subscription pump.
//!
//! Drains provider events into the shared model until the subscription is
//! cancelled, superseded or closed by the provider.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::model::{Generation, SharedModel};
use crate::error::SubscriptionError;
use crate::provider::{ProviderEvent, SubscriptionHandle};

/// Provider handle shared by the session and its pump.
///
/// Whichever side finishes first cancels it; later releases are no-ops.
#[derive(Clone)]
pub(crate) struct HandleSlot(Arc<Mutex<Option<Box<dyn SubscriptionHandle>>>>);

impl HandleSlot {
    pub(crate) fn new(handle: Box<dyn SubscriptionHandle>) -> Self {
        Self(Arc::new(Mutex::new(Some(handle))))
    }

    /// Cancel the handle if still held. Returns whether this call did it.
    pub(crate) fn release(&self) -> bool {
        match self.0.lock().take() {
            Some(mut handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_released(&self) -> bool {
        self.0.lock().is_none()
    }
}

/// Run the pump for subscription `generation`.
///
/// Exits when the token is cancelled, when the model no longer accepts this
/// generation, or after reporting a lost/closed subscription. A failed
/// subscription releases its provider handle before the pump exits.
pub(crate) async fn run_pump(
    shared: Arc<SharedModel>,
    generation: Generation,
    mut rx: mpsc::UnboundedReceiver<ProviderEvent>,
    handle: HandleSlot,
    token: CancellationToken,
) {
    debug!(generation, "Subscription pump started");

    loop {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                trace!(generation, "Subscription pump cancelled");
                break;
            }

            event = rx.recv() => {
                match event {
                    Some(ProviderEvent::Fix(fix)) => {
                        if !shared.apply_fix(generation, fix) {
                            break;
                        }
                    }
                    Some(ProviderEvent::Lost(reason)) => {
                        shared.fail_generation(generation, SubscriptionError::Lost(reason).into());
                        handle.release();
                        break;
                    }
                    None => {
                        shared.fail_generation(generation, SubscriptionError::Closed.into());
                        handle.release();
                        break;
                    }
                }
            }
        }
    }

    debug!(generation, "Subscription pump stopped");
}
