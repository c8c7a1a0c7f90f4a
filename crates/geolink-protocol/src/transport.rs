//! The transport seam between the client and the relay.

use async_trait::async_trait;
use geolink_types::{ClientEvent, RelayEvent};

use crate::error::ProtocolError;

/// A bidirectional, event-addressed channel to one relay endpoint.
///
/// Implementations deliver inbound events in FIFO order. When the
/// underlying connection goes away they yield a single
/// [`RelayEvent::Disconnect`] and then `None`.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a named event to the relay.
    async fn send(&mut self, event: &ClientEvent) -> Result<(), ProtocolError>;

    /// Receive the next inbound event.
    ///
    /// Must be cancel-safe: the client polls it inside `tokio::select!`.
    async fn recv(&mut self) -> Result<Option<RelayEvent>, ProtocolError>;

    /// Close the channel. Further sends fail with [`ProtocolError::Closed`].
    async fn close(&mut self) -> Result<(), ProtocolError>;
}
