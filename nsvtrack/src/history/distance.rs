//! Incremental great-circle distance over the retained history.

use crate::position::PositionSample;

/// Running total of Haversine distance between consecutive retained samples.
///
/// The total is maintained in O(1) per sample:
/// - appending adds the segment from the previous last sample to the new one
/// - evicting subtracts the segment from the evicted sample to the new first
///
/// so it always equals [`path_length`] of the retained samples.
#[derive(Debug, Clone, Default)]
pub struct DistanceAccumulator {
    total_meters: f64,
}

impl DistanceAccumulator {
    /// Create an accumulator at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for a newly appended sample.
    pub fn add_segment(&mut self, previous: Option<&PositionSample>, next: &PositionSample) {
        if let Some(previous) = previous {
            self.total_meters += previous.distance_to(next);
        }
    }

    /// Account for an evicted leading sample.
    ///
    /// `new_first` is the sample that is now oldest in the history.
    pub fn remove_leading_segment(
        &mut self,
        evicted: &PositionSample,
        new_first: Option<&PositionSample>,
    ) {
        if let Some(first) = new_first {
            // Float subtraction can dip marginally below zero
            self.total_meters = (self.total_meters - evicted.distance_to(first)).max(0.0);
        }
    }

    /// Reset to zero.
    pub fn reset(&mut self) {
        self.total_meters = 0.0;
    }

    /// Cumulative distance in meters.
    pub fn total_meters(&self) -> f64 {
        self.total_meters
    }
}

/// Sum of pairwise Haversine distances over an ordered sequence of samples.
///
/// Returns 0 for fewer than two samples.
pub fn path_length<'a, I>(samples: I) -> f64
where
    I: IntoIterator<Item = &'a PositionSample>,
{
    let mut iter = samples.into_iter();
    let Some(mut previous) = iter.next() else {
        return 0.0;
    };

    let mut total = 0.0;
    for sample in iter {
        total += previous.distance_to(sample);
        previous = sample;
    }
    total
}
