//! Position samples and raw provider fixes.
//!
//! A [`RawFix`] is whatever the location provider hands us. It becomes a
//! [`PositionSample`] only after validation, after which it is immutable.

mod sample;

pub use sample::{PositionSample, RawFix, SampleError};
