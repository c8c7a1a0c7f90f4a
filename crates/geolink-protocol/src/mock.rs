//! In-memory transport for testing.
//!
//! [`channel_pair`] returns a [`ChannelTransport`] for the client under test
//! and a [`RelayEnd`] the test drives as if it were the relay. Events cross
//! as encoded JSON frames so the wire format is exercised too.

use async_trait::async_trait;
use geolink_types::{ClientEvent, DisconnectInfo, RelayEvent};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::ProtocolError;
use crate::transport::Transport;
use crate::wire::{decode_frame, encode_frame};

/// Create a connected transport / relay-end pair.
pub fn channel_pair() -> (ChannelTransport, RelayEnd) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let transport = ChannelTransport {
        outbound: Some(out_tx),
        inbound: in_rx,
        disconnect_reported: false,
    };
    let relay = RelayEnd {
        sent: out_rx,
        deliver: Some(in_tx),
    };
    (transport, relay)
}

/// Client side of an in-memory relay link.
pub struct ChannelTransport {
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<String>,
    disconnect_reported: bool,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, event: &ClientEvent) -> Result<(), ProtocolError> {
        let tx = self.outbound.as_ref().ok_or(ProtocolError::Closed)?;
        let frame = encode_frame(event)?;
        tx.send(frame).map_err(|_| ProtocolError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<RelayEvent>, ProtocolError> {
        loop {
            if self.disconnect_reported {
                return Ok(None);
            }
            let Some(frame) = self.inbound.recv().await else {
                self.disconnect_reported = true;
                self.outbound = None;
                return Ok(Some(RelayEvent::Disconnect(DisconnectInfo {
                    reason: Some("relay hung up".to_string()),
                })));
            };
            match decode_frame::<RelayEvent>(&frame) {
                Ok(Some(RelayEvent::Disconnect(info))) => {
                    self.disconnect_reported = true;
                    self.outbound = None;
                    return Ok(Some(RelayEvent::Disconnect(info)));
                }
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "dropping malformed frame"),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        self.outbound = None;
        self.disconnect_reported = true;
        self.inbound.close();
        Ok(())
    }
}

/// The relay's side of an in-memory link, driven by tests.
pub struct RelayEnd {
    sent: mpsc::UnboundedReceiver<String>,
    deliver: Option<mpsc::UnboundedSender<String>>,
}

impl RelayEnd {
    /// Deliver an event to the client. Returns `false` if the client is gone.
    pub fn deliver(&self, event: &RelayEvent) -> bool {
        match encode_frame(event) {
            Ok(frame) => self.deliver_raw(frame),
            Err(e) => {
                warn!(error = %e, "failed to encode relay event");
                false
            }
        }
    }

    /// Deliver a raw text frame, bypassing encoding.
    pub fn deliver_raw(&self, frame: impl Into<String>) -> bool {
        self.deliver
            .as_ref()
            .is_some_and(|tx| tx.send(frame.into()).is_ok())
    }

    /// Wait for the next event the client sent.
    ///
    /// Returns `None` once the client side has closed or been dropped.
    pub async fn next_sent(&mut self) -> Option<ClientEvent> {
        loop {
            let frame = self.sent.recv().await?;
            if let Some(event) = decode_sent(&frame) {
                return Some(event);
            }
        }
    }

    /// Take the next already-sent event without waiting.
    pub fn try_next_sent(&mut self) -> Option<ClientEvent> {
        while let Ok(frame) = self.sent.try_recv() {
            if let Some(event) = decode_sent(&frame) {
                return Some(event);
            }
        }
        None
    }

    /// Take every already-sent event.
    pub fn drain_sent(&mut self) -> Vec<ClientEvent> {
        std::iter::from_fn(|| self.try_next_sent()).collect()
    }

    /// Drop the link from the relay side; the client sees a disconnect.
    pub fn hang_up(&mut self) {
        self.deliver = None;
    }
}

fn decode_sent(frame: &str) -> Option<ClientEvent> {
    match decode_frame::<ClientEvent>(frame) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "client sent malformed frame");
            None
        }
    }
}
