//! Sample acceptance rules.
//!
//! Ordering is always enforced: a fix older than the last accepted sample
//! is rejected, equal timestamps are accepted. Noise rejection is opt-in
//! through [`SampleFilter`]; the default filter accepts everything.

use thiserror::Error;

use crate::position::PositionSample;

/// Why an incoming sample was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum RejectReason {
    /// Timestamp precedes the last accepted sample.
    #[error("Out-of-order fix: {timestamp_ms}ms is before last accepted {last_ms}ms")]
    OutOfOrder { timestamp_ms: i64, last_ms: i64 },

    /// Reported horizontal accuracy is worse than the configured bound.
    #[error("Inaccurate fix: {accuracy_m:.1}m exceeds limit {limit_m:.1}m")]
    Inaccurate { accuracy_m: f64, limit_m: f64 },

    /// Jump from the previous sample implies an impossible speed.
    #[error("Implied speed {speed_mps:.1}m/s exceeds limit {limit_mps:.1}m/s")]
    ImpliedSpeed { speed_mps: f64, limit_mps: f64 },
}

/// Optional outlier rejection applied before a sample enters the history.
///
/// Both bounds default to `None` (unfiltered accumulation).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleFilter {
    /// Reject fixes whose horizontal accuracy radius exceeds this (meters).
    /// Fixes without a reported accuracy are accepted.
    pub max_accuracy_m: Option<f64>,
    /// Reject fixes whose implied speed from the last sample exceeds this (m/s).
    pub max_speed_mps: Option<f64>,
}

impl SampleFilter {
    /// Filter that accepts every in-order sample.
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Whether any noise rejection is configured.
    pub fn is_enabled(&self) -> bool {
        self.max_accuracy_m.is_some() || self.max_speed_mps.is_some()
    }

    /// Decide whether `candidate` may follow `last`.
    pub fn check(
        &self,
        last: Option<&PositionSample>,
        candidate: &PositionSample,
    ) -> Result<(), RejectReason> {
        if let Some(last) = last {
            if candidate.timestamp_ms() < last.timestamp_ms() {
                return Err(RejectReason::OutOfOrder {
                    timestamp_ms: candidate.timestamp_ms(),
                    last_ms: last.timestamp_ms(),
                });
            }
        }

        if let (Some(limit_m), Some(accuracy_m)) =
            (self.max_accuracy_m, candidate.horizontal_accuracy())
        {
            if accuracy_m > limit_m {
                return Err(RejectReason::Inaccurate {
                    accuracy_m,
                    limit_m,
                });
            }
        }

        if let (Some(limit_mps), Some(last)) = (self.max_speed_mps, last) {
            let distance = last.distance_to(candidate);
            let elapsed_ms = candidate.timestamp_ms().saturating_sub(last.timestamp_ms());
            let elapsed_secs = elapsed_ms as f64 / 1000.0;
            let speed_mps = if elapsed_secs > 0.0 {
                distance / elapsed_secs
            } else if distance > 0.0 {
                f64::INFINITY
            } else {
                0.0
            };

            if speed_mps > limit_mps {
                return Err(RejectReason::ImpliedSpeed {
                    speed_mps,
                    limit_mps,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::RawFix;

    fn fix(lat: f64, lon: f64, ts: i64) -> PositionSample {
        PositionSample::new(lat, lon, ts).unwrap()
    }

    #[test]
    fn test_unfiltered_accepts_jumps() {
        let filter = SampleFilter::unfiltered();
        assert!(!filter.is_enabled());

        let a = fix(0.0, 0.0, 0);
        let b = fix(10.0, 10.0, 1);
        assert!(filter.check(Some(&a), &b).is_ok());
    }

    #[test]
    fn test_out_of_order_always_rejected() {
        let filter = SampleFilter::unfiltered();
        let a = fix(0.0, 0.0, 2_000);
        let b = fix(0.0, 0.0, 1_000);

        assert_eq!(
            filter.check(Some(&a), &b),
            Err(RejectReason::OutOfOrder {
                timestamp_ms: 1_000,
                last_ms: 2_000
            })
        );
    }

    #[test]
    fn test_equal_timestamps_tolerated() {
        let filter = SampleFilter::unfiltered();
        let a = fix(0.0, 0.0, 1_000);
        let b = fix(0.0, 0.001, 1_000);
        assert!(filter.check(Some(&a), &b).is_ok());
    }

    #[test]
    fn test_accuracy_bound() {
        let filter = SampleFilter {
            max_accuracy_m: Some(20.0),
            ..Default::default()
        };
        let good = PositionSample::try_from(RawFix::new(0.0, 0.0, 0).with_accuracy(5.0)).unwrap();
        let bad = PositionSample::try_from(RawFix::new(0.0, 0.0, 0).with_accuracy(80.0)).unwrap();
        let unknown = fix(0.0, 0.0, 0);

        assert!(filter.check(None, &good).is_ok());
        assert!(matches!(
            filter.check(None, &bad),
            Err(RejectReason::Inaccurate { .. })
        ));
        assert!(filter.check(None, &unknown).is_ok());
    }

    #[test]
    fn test_implied_speed_bound() {
        let filter = SampleFilter {
            max_speed_mps: Some(50.0),
            ..Default::default()
        };
        let a = fix(0.0, 0.0, 0);
        // ~111m in 1s = 111 m/s
        let jump = fix(0.0, 0.001, 1_000);
        // ~111m in 10s = 11 m/s
        let walk = fix(0.0, 0.001, 10_000);

        assert!(matches!(
            filter.check(Some(&a), &jump),
            Err(RejectReason::ImpliedSpeed { .. })
        ));
        assert!(filter.check(Some(&a), &walk).is_ok());
    }

    #[test]
    fn test_implied_speed_same_timestamp() {
        let filter = SampleFilter {
            max_speed_mps: Some(50.0),
            ..Default::default()
        };
        let a = fix(0.0, 0.0, 0);
        let same_place = fix(0.0, 0.0, 0);
        let moved = fix(0.0, 0.001, 0);

        assert!(filter.check(Some(&a), &same_place).is_ok());
        assert!(filter.check(Some(&a), &moved).is_err());
    }

    #[test]
    fn test_implied_speed_extreme_timestamps() {
        let filter = SampleFilter {
            max_speed_mps: Some(50.0),
            ..Default::default()
        };
        let ancient = fix(0.0, 0.0, i64::MIN);
        let far_future = fix(0.0, 0.001, i64::MAX);

        // Elapsed time saturates instead of overflowing
        assert!(filter.check(Some(&ancient), &far_future).is_ok());
    }
}
