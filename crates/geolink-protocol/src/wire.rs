//! Wire format: one JSON text frame per event.
//!
//! Each frame is `{"event": "<name>", "data": <payload>}`. A missing or
//! `null` payload is read as `{}` since the relay emits some events bare.
//! Frames naming an event we do not know are skipped, not fatal.

use geolink_types::{ClientEvent, RelayEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProtocolError;

/// Maximum frame size (64 KiB). A location event is well under 1 KiB.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// An event enum that can travel as a frame.
pub trait WireEvent: Serialize + DeserializeOwned {
    /// Every event name this enum can decode.
    const NAMES: &'static [&'static str];
}

impl WireEvent for ClientEvent {
    const NAMES: &'static [&'static str] = &[
        "createConnection",
        "acceptConnection",
        "rejectConnection",
        "location",
    ];
}

impl WireEvent for RelayEvent {
    const NAMES: &'static [&'static str] = &[
        "connect",
        "disconnect",
        "connectionRequested",
        "connectionRequest",
        "connectionCreated",
        "connectionRejected",
        "location",
    ];
}

/// Encode an event as a JSON text frame.
pub fn encode_frame<T: WireEvent>(event: &T) -> Result<String, ProtocolError> {
    let text =
        serde_json::to_string(event).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(text)
}

/// Decode a JSON text frame.
///
/// Returns `Ok(None)` when the frame is well-formed but names an event
/// outside `T::NAMES`.
pub fn decode_frame<T: WireEvent>(text: &str) -> Result<Option<T>, ProtocolError> {
    if text.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: text.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    let mut value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
    let frame = value
        .as_object_mut()
        .ok_or_else(|| ProtocolError::Deserialization("frame is not an object".to_string()))?;

    let known = match frame.get("event") {
        Some(Value::String(name)) => T::NAMES.contains(&name.as_str()),
        _ => {
            return Err(ProtocolError::Deserialization(
                "frame has no event name".to_string(),
            ))
        }
    };
    if !known {
        return Ok(None);
    }

    if matches!(frame.get("data"), None | Some(Value::Null)) {
        frame.insert("data".to_string(), Value::Object(serde_json::Map::new()));
    }

    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ProtocolError::Deserialization(e.to_string()))
}

/// Event name of a raw frame, for logging frames that failed to decode.
pub fn frame_event_name(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.get("event")?.as_str().map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geolink_types::{PeerRef, RequestAck};

    #[test]
    fn encode_then_decode_client_event() {
        let event = ClientEvent::AcceptConnection(PeerRef::new("A".into()));
        let text = encode_frame(&event).unwrap();
        let decoded: ClientEvent = decode_frame(&text).unwrap().unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn bare_event_reads_as_empty_payload() {
        let decoded: RelayEvent = decode_frame(r#"{"event":"connectionRequested"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(decoded, RelayEvent::ConnectionRequested(RequestAck::default()));

        let decoded: RelayEvent = decode_frame(r#"{"event":"disconnect","data":null}"#)
            .unwrap()
            .unwrap();
        assert!(matches!(decoded, RelayEvent::Disconnect(_)));
    }

    #[test]
    fn unknown_event_is_skipped() {
        let decoded: Option<RelayEvent> =
            decode_frame(r#"{"event":"typing","data":{"id":"x"}}"#).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn client_event_names_are_not_relay_events() {
        let decoded: Option<RelayEvent> =
            decode_frame(r#"{"event":"createConnection","data":{"id":"x"}}"#).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn malformed_frames_error() {
        assert!(decode_frame::<RelayEvent>("not json").is_err());
        assert!(decode_frame::<RelayEvent>("[1,2]").is_err());
        assert!(decode_frame::<RelayEvent>(r#"{"data":{}}"#).is_err());
        // Known name, wrong payload shape.
        assert!(decode_frame::<RelayEvent>(r#"{"event":"connectionRequest","data":{}}"#).is_err());
    }

    #[test]
    fn oversized_frame_rejected() {
        let text = format!(
            r#"{{"event":"connectionRejected","data":{{"message":"{}"}}}}"#,
            "x".repeat(MAX_FRAME_SIZE)
        );
        assert!(matches!(
            decode_frame::<RelayEvent>(&text),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn frame_name_extraction() {
        assert_eq!(
            frame_event_name(r#"{"event":"location","data":5}"#).as_deref(),
            Some("location")
        );
        assert_eq!(frame_event_name("{}"), None);
    }
}
