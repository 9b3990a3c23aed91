//! Normalized position sample type.

use serde::Serialize;
use thiserror::Error;

use crate::geo::{haversine_distance, validate_coordinate, CoordError};

/// Conversion factor from meters per second to kilometers per hour.
const MPS_TO_KMH: f64 = 3.6;

/// Errors raised while normalizing a raw fix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    /// Latitude or longitude out of range (or not finite).
    #[error("Invalid fix coordinates: {0}")]
    InvalidCoordinate(#[from] CoordError),
}

/// An unnormalized position reading as delivered by a location provider.
///
/// Optional fields follow the provider's conventions: missing values are
/// `None`, but providers may also report negative or non-finite values for
/// "unknown", which normalization strips.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    /// Fix time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

impl RawFix {
    /// Create a fix with coordinates and timestamp only.
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
            ..Default::default()
        }
    }

    /// Attach a horizontal accuracy radius in meters.
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy = Some(meters);
        self
    }

    /// Attach ground speed (m/s) and heading (degrees).
    pub fn with_motion(mut self, speed: f64, heading: f64) -> Self {
        self.speed = Some(speed);
        self.heading = Some(heading);
        self
    }

    /// Attach altitude in meters.
    pub fn with_altitude(mut self, meters: f64) -> Self {
        self.altitude = Some(meters);
        self
    }
}

/// One normalized position fix.
///
/// Fields are private so a sample can only be produced through validation
/// and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSample {
    latitude: f64,
    longitude: f64,
    altitude: Option<f64>,
    horizontal_accuracy: Option<f64>,
    speed: Option<f64>,
    heading: Option<f64>,
    timestamp_ms: i64,
}

impl PositionSample {
    /// Create a sample from validated coordinates with no metadata.
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Result<Self, SampleError> {
        RawFix::new(latitude, longitude, timestamp_ms).try_into()
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Altitude in meters, if reported.
    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    /// Horizontal accuracy radius in meters, if reported.
    pub fn horizontal_accuracy(&self) -> Option<f64> {
        self.horizontal_accuracy
    }

    /// Ground speed in m/s, if reported.
    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    /// Ground speed in km/h, if reported.
    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed.map(|s| s * MPS_TO_KMH)
    }

    /// Heading in degrees (0 = North), if reported.
    pub fn heading(&self) -> Option<f64> {
        self.heading
    }

    /// Fix time in milliseconds since the Unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Haversine distance in meters to another sample.
    pub fn distance_to(&self, other: &PositionSample) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

impl TryFrom<RawFix> for PositionSample {
    type Error = SampleError;

    fn try_from(fix: RawFix) -> Result<Self, Self::Error> {
        validate_coordinate(fix.latitude, fix.longitude)?;

        Ok(Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            // Altitude may legitimately be negative (below sea level)
            altitude: fix.altitude.filter(|a| a.is_finite()),
            horizontal_accuracy: non_negative(fix.accuracy),
            speed: non_negative(fix.speed),
            heading: non_negative(fix.heading).map(|h| h.rem_euclid(360.0)),
            timestamp_ms: fix.timestamp_ms,
        })
    }
}

/// Providers report "unknown" as -1 or NaN for several fields.
fn non_negative(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}
