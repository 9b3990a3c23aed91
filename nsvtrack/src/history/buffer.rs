//! Bounded position sample history.
//!
//! Keeps the most recent samples of a tracking session in arrival order.
//!
//! # Design
//!
//! - Holds at most [`HISTORY_CAPACITY`] samples (1000)
//! - Appends are O(1); at capacity the oldest sample is evicted first
//! - Traversal order is insertion order (oldest first)
//! - Readers get owned copies, so a snapshot never changes under them

use std::collections::VecDeque;

use crate::position::PositionSample;

/// Default maximum samples to retain.
pub const HISTORY_CAPACITY: usize = 1000;

/// Bounded FIFO-evicting history of position samples.
///
/// # Usage
///
/// ```
/// use nsvtrack::history::SampleBuffer;
/// use nsvtrack::position::PositionSample;
///
/// let mut buffer = SampleBuffer::new();
/// let evicted = buffer.append(PositionSample::new(53.5, 10.0, 0).unwrap());
/// assert!(evicted.is_none());
/// assert_eq!(buffer.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    /// Retained samples (oldest first).
    samples: VecDeque<PositionSample>,
    /// Maximum number of retained samples.
    capacity: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleBuffer {
    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create a buffer with a custom capacity (at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one first when full.
    ///
    /// Returns the evicted sample, if any.
    pub fn append(&mut self, sample: PositionSample) -> Option<PositionSample> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest retained sample.
    pub fn first(&self) -> Option<&PositionSample> {
        self.samples.front()
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    /// Iterate over samples (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    /// Copy of the full history (oldest first).
    pub fn snapshot(&self) -> Vec<PositionSample> {
        self.samples.iter().copied().collect()
    }

    /// Copy of the last `n` samples (oldest first).
    pub fn recent(&self, n: usize) -> Vec<PositionSample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }

    /// Remove all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
