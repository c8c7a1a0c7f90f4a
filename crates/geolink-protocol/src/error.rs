//! Protocol and transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("serialisation error: {0}")]
    Serialization(String),

    #[error("deserialisation error: {0}")]
    Deserialization(String),

    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("transport closed")]
    Closed,

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProtocolError {
    /// Whether the link to the relay is gone, as opposed to a single event
    /// that could not be encoded.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            Self::Closed | Self::Connection(_) | Self::WebSocket(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_failures_are_not_disconnects() {
        assert!(!ProtocolError::FrameTooLarge { size: 70_000, max: 65_536 }.is_disconnect());
        assert!(!ProtocolError::Serialization("bad".to_string()).is_disconnect());
        assert!(ProtocolError::Closed.is_disconnect());
        assert!(ProtocolError::Connection("reset".to_string()).is_disconnect());
        assert!(ProtocolError::WebSocket(
            tokio_tungstenite::tungstenite::Error::ConnectionClosed
        )
        .is_disconnect());
    }
}
