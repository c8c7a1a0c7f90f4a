//! Shared types for geolink.
//!
//! This crate contains the types shared across the geolink workspace:
//! relay-assigned session identifiers, location samples, peer descriptors,
//! and the named events exchanged with the relay.

pub mod location;
pub mod message;
pub mod session;

pub use location::{Coords, CoordinateError, Location};
pub use message::{
    ClientEvent, DisconnectInfo, LocationMessage, PeerDescriptor, PeerRef, Rejection, RelayEvent,
    RequestAck,
};
pub use session::{SessionId, MAX_SESSION_ID_LEN};
