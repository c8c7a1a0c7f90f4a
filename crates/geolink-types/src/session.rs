//! Session identity types.

use serde::{Deserialize, Serialize};

/// Longest session id we will address. Relay-assigned ids are far shorter.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// Opaque identifier naming a client's transport endpoint.
///
/// Assigned by the relay when the transport connects and immutable for the
/// life of that connection. Used both as the addressee of a connection
/// request and as the label of the current peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a relay-assigned identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (or only whitespace).
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_as_plain_string() {
        let id = SessionId::new("abc123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc123\"");
        let decoded: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, id);
    }

    #[test]
    fn blank_detection() {
        assert!(SessionId::new("").is_blank());
        assert!(SessionId::new("  ").is_blank());
        assert!(!SessionId::new("x").is_blank());
    }

    #[test]
    fn display_is_raw_id() {
        assert_eq!(SessionId::from("peer-b").to_string(), "peer-b");
    }
}
