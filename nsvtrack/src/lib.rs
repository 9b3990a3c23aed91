//! nsvtrack - location tracking sessions
//!
//! This library turns a stream of position fixes from a platform location
//! provider into a bounded, ordered track with a cumulative distance, under
//! an explicit start/stop lifecycle.
//!
//! # Overview
//!
//! ```text
//! LocationProvider ──► PermissionGate ──► TrackingSession ──► TrackHistory
//!   (platform/sim)       (fg / bg access)    (state machine)    (buffer + distance)
//!                                                  │
//!                                                  └──► TrackingObserver (snapshots)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nsvtrack::provider::SimulatedProvider;
//! use nsvtrack::session::{SessionConfig, TrackingSession};
//!
//! let provider = Arc::new(SimulatedProvider::default());
//! let mut session = TrackingSession::new(provider, SessionConfig::default());
//! session.start().await?;
//! ```

pub mod accuracy;
pub mod config;
pub mod error;
pub mod geo;
pub mod history;
pub mod logging;
pub mod permission;
pub mod position;
pub mod provider;
pub mod session;

pub use accuracy::{AccuracyPolicy, AccuracyProfile};
pub use error::{ErrorKind, TrackingError};
pub use permission::{AccessLevel, PermissionGate, PermissionStatus};
pub use position::{PositionSample, RawFix};
pub use session::{SessionConfig, TrackingObserver, TrackingSession, TrackingState, TrackingStatus};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
