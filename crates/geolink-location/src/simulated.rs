//! Configuration-driven permission and position sources.
//!
//! Used where there is no device location service: the CLI on a desktop,
//! demos, and soak runs against a real relay.

use async_trait::async_trait;
use geolink_types::{Coords, Location};
use tracing::debug;

use crate::error::LocationError;
use crate::{LocationSource, PermissionGate};

/// A permission gate with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission {
    granted: bool,
}

impl StaticPermission {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }
}

#[async_trait]
impl PermissionGate for StaticPermission {
    async fn request(&mut self) -> Result<bool, LocationError> {
        debug!(granted = self.granted, "static permission answered");
        Ok(self.granted)
    }
}

/// Always reports the same position, stamped with the current time.
#[derive(Debug, Clone)]
pub struct FixedLocation {
    coords: Coords,
}

impl FixedLocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        Ok(Self {
            coords: Coords::new(latitude, longitude)?,
        })
    }
}

#[async_trait]
impl LocationSource for FixedLocation {
    async fn last_known(&mut self) -> Result<Option<Location>, LocationError> {
        Ok(Some(Location::now(self.coords.clone())))
    }

    async fn current(&mut self) -> Result<Location, LocationError> {
        Ok(Location::now(self.coords.clone()))
    }
}

/// Walks a list of waypoints, one per fresh sample, wrapping at the end.
///
/// Has no cached fix, so every publisher tick advances the track.
#[derive(Debug, Clone)]
pub struct TrackLocation {
    waypoints: Vec<Coords>,
    next: usize,
}

impl TrackLocation {
    /// Build a track from `(latitude, longitude)` pairs.
    pub fn new(points: &[(f64, f64)]) -> Result<Self, LocationError> {
        if points.is_empty() {
            return Err(LocationError::Unavailable("empty track".to_string()));
        }
        let waypoints = points
            .iter()
            .map(|&(lat, lon)| Coords::new(lat, lon))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { waypoints, next: 0 })
    }
}

#[async_trait]
impl LocationSource for TrackLocation {
    async fn last_known(&mut self) -> Result<Option<Location>, LocationError> {
        Ok(None)
    }

    async fn current(&mut self) -> Result<Location, LocationError> {
        let coords = self.waypoints[self.next].clone();
        self.next = (self.next + 1) % self.waypoints.len();
        Ok(Location::now(coords))
    }
}

/// Used when no position is configured: every sample fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationSource for NoLocation {
    async fn last_known(&mut self) -> Result<Option<Location>, LocationError> {
        Ok(None)
    }

    async fn current(&mut self) -> Result<Location, LocationError> {
        Err(LocationError::Unavailable(
            "no location source configured".to_string(),
        ))
    }
}
