//! Integration test: WebSocket transport against a stub relay on loopback.

use futures_util::{SinkExt, StreamExt};
use geolink_protocol::wire::{decode_frame, encode_frame};
use geolink_protocol::{Transport, WsTransport};
use geolink_types::{ClientEvent, PeerRef, RelayEvent};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn connect_request_and_disconnect_over_websocket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let relay = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

        // Heartbeat before anything else; the client must answer it once.
        ws.send(Message::Ping(b"hb".to_vec())).await.unwrap();

        // Assign the client its session id.
        let hello = encode_frame(&RelayEvent::Connect(PeerRef::new("client-a".into()))).unwrap();
        ws.send(Message::Text(hello)).await.unwrap();

        // An event we don't know about must not break the client.
        ws.send(Message::Text(r#"{"event":"typing","data":{}}"#.to_string()))
            .await
            .unwrap();

        // Expect a createConnection addressed to B.
        let mut pongs = 0;
        let frame = loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => break text,
                Message::Pong(data) => {
                    assert_eq!(data, b"hb".to_vec());
                    pongs += 1;
                }
                _ => continue,
            }
        };
        assert_eq!(pongs, 1);
        let event: ClientEvent = decode_frame(&frame).unwrap().unwrap();
        assert_eq!(
            event,
            ClientEvent::CreateConnection(PeerRef::new("client-b".into()))
        );

        let ack = r#"{"event":"connectionRequested","data":{}}"#;
        ws.send(Message::Text(ack.to_string())).await.unwrap();

        ws.close(None).await.unwrap();
    });

    let mut transport = WsTransport::connect(&format!("ws://{addr}")).await.unwrap();

    match transport.recv().await.unwrap() {
        Some(RelayEvent::Connect(peer)) => assert_eq!(peer.id.as_str(), "client-a"),
        other => panic!("expected connect, got {other:?}"),
    }

    transport
        .send(&ClientEvent::CreateConnection(PeerRef::new(
            "client-b".into(),
        )))
        .await
        .unwrap();

    assert!(matches!(
        transport.recv().await.unwrap(),
        Some(RelayEvent::ConnectionRequested(_))
    ));

    // Relay closes: exactly one disconnect, then end of stream.
    assert!(matches!(
        transport.recv().await.unwrap(),
        Some(RelayEvent::Disconnect(_))
    ));
    assert_eq!(transport.recv().await.unwrap(), None);

    relay.await.unwrap();
}

#[tokio::test]
async fn connect_to_missing_relay_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = WsTransport::connect(&format!("ws://{addr}")).await;
    assert!(result.is_err());
}
