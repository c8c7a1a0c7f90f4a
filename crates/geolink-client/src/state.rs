//! Connection state for the single peer slot.

use geolink_types::SessionId;
use thiserror::Error;

/// Handshake state of a client's one peer slot.
///
/// The peer id lives inside every non-idle variant, so a bound or pending
/// peer exists exactly when the state is not `Idle`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No peer, no handshake in progress.
    #[default]
    Idle,
    /// We sent `createConnection` to `peer`.
    Requesting { peer: SessionId },
    /// `peer` has our request and is deciding.
    Awaiting { peer: SessionId },
    /// `peer` asked to connect to us. `accepted` once we sent
    /// `acceptConnection` and are waiting for `connectionCreated`.
    Requested { peer: SessionId, accepted: bool },
    /// Handshake complete, streaming with `peer`.
    Connected { peer: SessionId },
}

impl ConnectionState {
    /// The bound or pending peer, if any.
    pub fn peer(&self) -> Option<&SessionId> {
        match self {
            Self::Idle => None,
            Self::Requesting { peer }
            | Self::Awaiting { peer }
            | Self::Requested { peer, .. }
            | Self::Connected { peer } => Some(peer),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Short state name, without the peer.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting { .. } => "requesting",
            Self::Awaiting { .. } => "awaiting",
            Self::Requested { .. } => "requested",
            Self::Connected { .. } => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.peer() {
            Some(peer) => write!(f, "{}({peer})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// The last error surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("permission required")]
    PermissionRequired,

    #[error("{0}")]
    Rejected(String),

    #[error("location unavailable: {0}")]
    Sampling(String),

    #[error("disconnected from relay")]
    Disconnected,

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("failed to send: {0}")]
    SendFailed(String),
}
