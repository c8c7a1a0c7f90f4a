//! Named events exchanged with the relay.
//!
//! Every event travels as `{"event": "<name>", "data": <payload>}`. Event
//! names are camelCase to match the relay's contract.

use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::session::SessionId;

/// Payload naming a single session: `{ "id": ".." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRef {
    pub id: SessionId,
}

impl PeerRef {
    pub fn new(id: SessionId) -> Self {
        Self { id }
    }
}

/// Descriptor of the peer a session was created with.
///
/// The relay may attach extra fields; they are kept but not interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerDescriptor {
    pub id: SessionId,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PeerDescriptor {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            extra: serde_json::Map::new(),
        }
    }
}

/// Acknowledgement that an outgoing request is pending at the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SessionId>,
}

/// Reason a handshake failed or was withdrawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    #[serde(default)]
    pub message: String,
}

impl Rejection {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Transport teardown notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A location sample addressed to (outbound) or about (inbound) a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMessage {
    pub id: SessionId,
    pub location: Location,
}

/// Events a client sends to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Ask the relay to start a session with the target.
    CreateConnection(PeerRef),

    /// Accept a pending incoming request.
    AcceptConnection(PeerRef),

    /// Reject an incoming request, or withdraw our own pending request.
    RejectConnection(PeerRef),

    /// Location sample for the bound peer.
    Location(LocationMessage),
}

impl ClientEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateConnection(_) => "createConnection",
            Self::AcceptConnection(_) => "acceptConnection",
            Self::RejectConnection(_) => "rejectConnection",
            Self::Location(_) => "location",
        }
    }

    /// Session this event is addressed to.
    pub fn addressee(&self) -> &SessionId {
        match self {
            Self::CreateConnection(r) | Self::AcceptConnection(r) | Self::RejectConnection(r) => {
                &r.id
            }
            Self::Location(m) => &m.id,
        }
    }
}

/// Events the relay (or the transport itself) delivers to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RelayEvent {
    /// Transport is up; carries the session id the relay assigned us.
    Connect(PeerRef),

    /// Transport is gone.
    Disconnect(DisconnectInfo),

    /// Our request reached the target and awaits its decision.
    ConnectionRequested(RequestAck),

    /// Another client wants to connect to us.
    ConnectionRequest(PeerRef),

    /// Handshake complete.
    ConnectionCreated(PeerDescriptor),

    /// Handshake failed or was cancelled.
    ConnectionRejected(Rejection),

    /// Location sample forwarded from a peer.
    Location(LocationMessage),
}

impl RelayEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Disconnect(_) => "disconnect",
            Self::ConnectionRequested(_) => "connectionRequested",
            Self::ConnectionRequest(_) => "connectionRequest",
            Self::ConnectionCreated(_) => "connectionCreated",
            Self::ConnectionRejected(_) => "connectionRejected",
            Self::Location(_) => "location",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Coords;

    #[test]
    fn create_connection_wire_shape() {
        let event = ClientEvent::CreateConnection(PeerRef::new("B".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "createConnection", "data": {"id": "B"}})
        );
        assert_eq!(event.name(), "createConnection");
    }

    #[test]
    fn location_wire_shape() {
        let event = ClientEvent::Location(LocationMessage {
            id: "peer".into(),
            location: Location::new(Coords::new(10.0, 20.0).unwrap(), 42),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "location",
                "data": {
                    "id": "peer",
                    "location": {"coords": {"latitude": 10.0, "longitude": 20.0}, "timestamp": 42}
                }
            })
        );
    }

    #[test]
    fn connection_created_keeps_extra_fields() {
        let json = r#"{"event":"connectionCreated","data":{"id":"A","name":"phone"}}"#;
        let event: RelayEvent = serde_json::from_str(json).unwrap();
        match event {
            RelayEvent::ConnectionCreated(peer) => {
                assert_eq!(peer.id.as_str(), "A");
                assert_eq!(peer.extra.get("name"), Some(&serde_json::json!("phone")));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn connection_requested_accepts_empty_payload() {
        let json = r#"{"event":"connectionRequested","data":{}}"#;
        let event: RelayEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, RelayEvent::ConnectionRequested(RequestAck::default()));
    }

    #[test]
    fn rejection_without_message() {
        let json = r#"{"event":"connectionRejected","data":{}}"#;
        let event: RelayEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, RelayEvent::ConnectionRejected(Rejection::default()));
    }


    #[test]
    fn addressee_of_outbound_events() {
        let event = ClientEvent::RejectConnection(PeerRef::new("X".into()));
        assert_eq!(event.addressee().as_str(), "X");
    }
}
