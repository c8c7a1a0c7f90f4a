//! Location permission and position sources for geolink.
//!
//! This crate defines the [`PermissionGate`] and [`LocationSource`] traits
//! the client samples through. Device backends live outside this
//! workspace; [`simulated`] provides configuration-driven sources for the
//! CLI and the `mock` feature provides scriptable backends for tests.

use async_trait::async_trait;
use geolink_types::Location;

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod simulated;

pub use error::LocationError;

/// Queries or requests device location authorization.
#[async_trait]
pub trait PermissionGate: Send + 'static {
    /// Request foreground location access, resolving to the user's decision.
    ///
    /// May suspend for as long as a prompt is on screen.
    async fn request(&mut self) -> Result<bool, LocationError>;
}

/// Produces device position samples.
#[async_trait]
pub trait LocationSource: Send + 'static {
    /// Most recent cached fix, if the device has one. Must not block on a
    /// fresh fix.
    async fn last_known(&mut self) -> Result<Option<Location>, LocationError>;

    /// Actively sample the current position.
    async fn current(&mut self) -> Result<Location, LocationError>;
}

/// Sample a position the way the publisher does: cached fix first, fresh
/// fix otherwise.
pub async fn sample(source: &mut dyn LocationSource) -> Result<Location, LocationError> {
    match source.last_known().await? {
        Some(location) => Ok(location),
        None => source.current().await,
    }
}
