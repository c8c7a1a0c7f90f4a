//! WebSocket transport to the relay.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use geolink_types::{ClientEvent, DisconnectInfo, RelayEvent};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use crate::error::ProtocolError;
use crate::transport::Transport;
use crate::wire::{decode_frame, encode_frame, frame_event_name};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] speaking JSON event frames over a WebSocket.
pub struct WsTransport {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
    url: String,
    closed: bool,
    disconnect_reported: bool,
}

impl WsTransport {
    /// Connect to a relay at `url` (`ws://` or `wss://`).
    pub async fn connect(url: &str) -> Result<Self, ProtocolError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ProtocolError::Connection(format!("{url}: {e}")))?;
        let (sink, stream) = stream.split();
        info!(url = %url, "relay transport connected");
        Ok(Self {
            sink,
            stream,
            url: url.to_string(),
            closed: false,
            disconnect_reported: false,
        })
    }

    /// The relay URL this transport was opened against.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Yield the synthesized disconnect once, then end the stream.
    fn report_disconnect(&mut self, reason: Option<String>) -> Option<RelayEvent> {
        self.closed = true;
        if self.disconnect_reported {
            return None;
        }
        self.disconnect_reported = true;
        info!(url = %self.url, reason = ?reason, "relay transport disconnected");
        Some(RelayEvent::Disconnect(DisconnectInfo { reason }))
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, event: &ClientEvent) -> Result<(), ProtocolError> {
        if self.closed {
            return Err(ProtocolError::Closed);
        }
        let text = encode_frame(event)?;
        self.sink.send(Message::Text(text)).await?;
        trace!(event = event.name(), "sent frame");
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<RelayEvent>, ProtocolError> {
        loop {
            if self.closed {
                return Ok(self.report_disconnect(None));
            }
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => match decode_frame::<RelayEvent>(&text) {
                    Ok(Some(event)) => {
                        trace!(event = event.name(), "received frame");
                        if let RelayEvent::Disconnect(info) = event {
                            return Ok(self.report_disconnect(info.reason));
                        }
                        return Ok(Some(event));
                    }
                    Ok(None) => {
                        debug!(event = ?frame_event_name(&text), "skipping unknown event");
                    }
                    Err(e) => {
                        warn!(error = %e, event = ?frame_event_name(&text), "dropping malformed frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    return Ok(self.report_disconnect(reason));
                }
                // Pings are answered by tungstenite itself on the next read.
                Some(Ok(
                    Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_),
                )) => {}
                Some(Err(e)) => {
                    return Ok(self.report_disconnect(Some(e.to_string())));
                }
                None => return Ok(self.report_disconnect(None)),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ProtocolError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.disconnect_reported = true;
        // The relay may already have dropped the socket; closing is best effort.
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "error closing relay socket");
        }
        info!(url = %self.url, "relay transport closed");
        Ok(())
    }
}
