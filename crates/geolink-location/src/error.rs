//! Location subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("invalid coordinates: {0}")]
    Coordinates(#[from] geolink_types::CoordinateError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
