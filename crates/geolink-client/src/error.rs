//! Client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("protocol error: {0}")]
    Protocol(#[from] geolink_protocol::ProtocolError),

    #[error("location error: {0}")]
    Location(#[from] geolink_location::LocationError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
