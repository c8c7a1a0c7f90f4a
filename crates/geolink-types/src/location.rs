//! Location samples.
//!
//! The JSON shape mirrors what mobile location APIs report:
//! `{ "coords": { "latitude": .., "longitude": .. }, "timestamp": <ms> }`.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Rejected coordinate values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} out of range [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    Longitude(f64),
}

/// A coordinate pair plus the optional extras a device may report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl Coords {
    /// Build a validated coordinate pair.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            heading: None,
            speed: None,
        })
    }
}

/// A single device position sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coords: Coords,
    /// Milliseconds since the Unix epoch.
    #[serde(deserialize_with = "timestamp_millis")]
    pub timestamp: u64,
}

impl Location {
    pub fn new(coords: Coords, timestamp: u64) -> Self {
        Self { coords, timestamp }
    }

    /// Stamp `coords` with the current wall-clock time.
    pub fn now(coords: Coords) -> Self {
        Self::new(coords, now_millis())
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// Peers on other platforms may send fractional millisecond timestamps.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn timestamp_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(ms) => Ok(ms),
        Raw::Float(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms as u64),
        Raw::Float(ms) => Err(de::Error::custom(format!("invalid timestamp {ms}"))),
    }
}
