//! Bounded position history and cumulative distance.
//!
//! ```text
//! PositionSample ──► SampleFilter ──► SampleBuffer ──► DistanceAccumulator
//!                    (ordering,       (FIFO, 1000)     (Haversine, O(1))
//!                     opt-in noise)
//! ```
//!
//! [`TrackHistory`] ties the pieces together so the buffer and the distance
//! are always updated as one unit.

mod buffer;
mod distance;
mod filter;
mod track;

pub use buffer::{SampleBuffer, HISTORY_CAPACITY};
pub use distance::{path_length, DistanceAccumulator};
pub use filter::{RejectReason, SampleFilter};
pub use track::TrackHistory;
