//! Sample buffer and distance accumulator kept in lockstep.

use tracing::{debug, trace};

use super::{DistanceAccumulator, RejectReason, SampleBuffer, SampleFilter};
use crate::position::PositionSample;

/// The retained track of a session: history plus its cumulative distance.
///
/// Every accepted sample goes through [`TrackHistory::record`], which updates
/// both halves together so the distance always describes exactly the
/// retained samples.
#[derive(Debug, Clone, Default)]
pub struct TrackHistory {
    buffer: SampleBuffer,
    distance: DistanceAccumulator,
    filter: SampleFilter,
    rejected: u64,
}

impl TrackHistory {
    /// Create an unfiltered track with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a track with an explicit buffer and filter.
    pub fn with_parts(buffer: SampleBuffer, filter: SampleFilter) -> Self {
        Self {
            buffer,
            distance: DistanceAccumulator::new(),
            filter,
            rejected: 0,
        }
    }

    /// Record a sample.
    ///
    /// Returns the evicted sample if the buffer was full, or the reason the
    /// sample was rejected.
    pub fn record(
        &mut self,
        sample: PositionSample,
    ) -> Result<Option<PositionSample>, RejectReason> {
        if let Err(reason) = self.filter.check(self.buffer.last(), &sample) {
            self.rejected += 1;
            debug!(%reason, rejected = self.rejected, "Sample rejected");
            return Err(reason);
        }

        let previous = self.buffer.last().copied();
        let evicted = self.buffer.append(sample);

        if let Some(evicted) = evicted.as_ref() {
            self.distance
                .remove_leading_segment(evicted, self.buffer.first());
        }
        if self.buffer.len() < 2 {
            self.distance.reset();
        } else {
            self.distance.add_segment(previous.as_ref(), &sample);
        }

        trace!(
            len = self.buffer.len(),
            distance_m = self.distance.total_meters(),
            "Sample recorded"
        );
        Ok(evicted)
    }

    /// Empty the history and its distance.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.distance.reset();
    }

    /// The retained samples.
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Cumulative distance over the retained samples in meters.
    pub fn distance_meters(&self) -> f64 {
        self.distance.total_meters()
    }

    /// Samples rejected since creation.
    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{path_length, HISTORY_CAPACITY};
    use proptest::prelude::*;

    fn sample(lat: f64, lon: f64, ts: i64) -> PositionSample {
        PositionSample::new(lat, lon, ts).unwrap()
    }

    #[test]
    fn test_single_sample_zero_distance() {
        let mut track = TrackHistory::new();
        track.record(sample(0.0, 0.0, 0)).unwrap();
        assert_eq!(track.distance_meters(), 0.0);
    }

    #[test]
    fn test_distance_two_samples() {
        let mut track = TrackHistory::new();
        let a = sample(0.0, 0.0, 0);
        let b = sample(0.0, 0.001, 1_000);
        track.record(a).unwrap();
        track.record(b).unwrap();

        let expected = a.distance_to(&b);
        assert!((track.distance_meters() - expected).abs() / expected < 1e-3);
    }

    #[test]
    fn test_eviction_keeps_distance_consistent() {
        let mut track = TrackHistory::new();
        for i in 0..=HISTORY_CAPACITY {
            track
                .record(sample(0.0, i as f64 * 0.0001, i as i64))
                .unwrap();
        }

        assert_eq!(track.buffer().len(), HISTORY_CAPACITY);
        assert_eq!(track.buffer().first().unwrap().timestamp_ms(), 1);

        let expected = path_length(track.buffer().iter());
        assert!(
            (track.distance_meters() - expected).abs() < 1e-6 * expected,
            "incremental {} vs full {}",
            track.distance_meters(),
            expected
        );
    }

    #[test]
    fn test_capacity_one_stays_zero() {
        let mut track = TrackHistory::with_parts(SampleBuffer::with_capacity(1), SampleFilter::default());
        track.record(sample(0.0, 0.0, 0)).unwrap();
        track.record(sample(1.0, 1.0, 1)).unwrap();
        assert_eq!(track.distance_meters(), 0.0);
    }

    #[test]
    fn test_rejection_counts_and_leaves_state() {
        let mut track = TrackHistory::new();
        track.record(sample(0.0, 0.0, 5_000)).unwrap();

        let result = track.record(sample(0.0, 1.0, 1_000));
        assert!(matches!(result, Err(RejectReason::OutOfOrder { .. })));
        assert_eq!(track.rejected_count(), 1);
        assert_eq!(track.buffer().len(), 1);
        assert_eq!(track.distance_meters(), 0.0);
    }

    #[test]
    fn test_filter_applies_when_enabled() {
        let mut track = TrackHistory::with_parts(
            SampleBuffer::new(),
            SampleFilter {
                max_speed_mps: Some(10.0),
                ..Default::default()
            },
        );

        track.record(sample(0.0, 0.0, 0)).unwrap();
        assert!(track.record(sample(0.0, 1.0, 1_000)).is_err());
        assert!(track.record(sample(0.0, 0.00005, 1_000)).is_ok());
        assert_eq!(track.buffer().len(), 2);
    }

    #[test]
    fn test_clear_resets_distance() {
        let mut track = TrackHistory::new();
        track.record(sample(0.0, 0.0, 0)).unwrap();
        track.record(sample(0.0, 0.01, 1)).unwrap();
        assert!(track.distance_meters() > 0.0);

        track.clear();
        assert!(track.buffer().is_empty());
        assert_eq!(track.distance_meters(), 0.0);

        // Next sample starts a fresh path
        track.record(sample(5.0, 5.0, 2)).unwrap();
        assert_eq!(track.distance_meters(), 0.0);
    }

    mod property_tests {
        use super::*;

        proptest! {
            #[test]
            fn test_incremental_matches_full_recompute(
                points in prop::collection::vec((-60.0..60.0_f64, -170.0..170.0_f64), 1..200),
                capacity in 1usize..64,
            ) {
                let mut track = TrackHistory::with_parts(
                    SampleBuffer::with_capacity(capacity),
                    SampleFilter::default(),
                );
                for (i, (lat, lon)) in points.iter().enumerate() {
                    track.record(sample(*lat, *lon, i as i64)).unwrap();
                }

                let expected = path_length(track.buffer().iter());
                let tolerance = 1e-6 * expected.max(1.0);
                prop_assert!(
                    (track.distance_meters() - expected).abs() <= tolerance,
                    "incremental {} vs full {}",
                    track.distance_meters(),
                    expected
                );
                prop_assert!(track.buffer().len() <= capacity);
            }
        }
    }
}
