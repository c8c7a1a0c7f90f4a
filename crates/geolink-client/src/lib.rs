//! Core client for geolink.
//!
//! Implements the connection state machine for the single peer slot, the
//! location publisher gated on it, and the event loop that runs the
//! machine's commands against the relay transport.

pub mod client;
pub mod config;
pub mod error;
pub mod machine;
pub mod publisher;
pub mod setup;
pub mod state;

pub use client::{Client, ClientCommand, ClientStatus};
pub use config::Config;
pub use error::ClientError;
pub use machine::{Command, ConnectionMachine, Intent, PermissionPurpose, Session, Trigger};
pub use state::{ConnectionState, SessionError};
