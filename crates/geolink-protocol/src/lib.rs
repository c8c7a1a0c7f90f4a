//! Relay transport channel and wire protocol for geolink.
//!
//! This crate defines the [`Transport`] seam the client event loop talks
//! through, the JSON event framing (`{"event": .., "data": ..}`), and a
//! WebSocket implementation. An in-memory channel implementation is
//! available behind the `mock` feature for tests.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod transport;
pub mod wire;
pub mod ws;

pub use error::ProtocolError;
pub use transport::Transport;
pub use ws::WsTransport;
