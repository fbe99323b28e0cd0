//! Tests for relaying forwarded channels to a websocket endpoint

mod common;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_test::assert_ok;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, connect_async};

use common::{MockSession, Reply};
use x11relay::transport::WebSocketEndpoint;
use x11relay::X11Forwarder;

const DEADLINE: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_channel_relays_through_websocket_endpoint() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Peer on the far side of the websocket echoes the first frame back
    let peer = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();

        let first = ws.next().await.unwrap().unwrap();
        assert_eq!(first, Message::Binary(Bytes::from_static(b"HELLO")));
        ws.send(Message::Binary(Bytes::from_static(b"HELLO"))).await.unwrap();

        let mut closed = false;
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Close(_)) => {
                    closed = true;
                    break;
                }
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        let _ = ws.close(None).await;
        closed
    });

    let (ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

    let session = MockSession::new(Reply::Accept);
    let forwarding = assert_ok!(
        X11Forwarder::new(Arc::clone(&session))
            .with_endpoint(WebSocketEndpoint::new(ws))
            .start()
            .await
    );

    let mut remote = session.open_x11("10.0.0.1:6010").await.unwrap();
    remote.write_all(b"HELLO").await.unwrap();

    let mut buf = [0u8; 5];
    timeout(DEADLINE, remote.read_exact(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf, b"HELLO");

    // Remote half-close reaches the peer as a close frame
    remote.shutdown().await.unwrap();
    assert!(timeout(DEADLINE, peer).await.unwrap().unwrap());

    let mut rest = Vec::new();
    timeout(DEADLINE, remote.read_to_end(&mut rest)).await.unwrap().unwrap();
    assert!(rest.is_empty());

    assert_eq!(session.accepted(), 1);
    drop(forwarding);
}

#[tokio::test]
async fn test_frames_are_read_back_to_back() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        ws.send(Message::Binary(Bytes::from_static(b"xclock"))).await.unwrap();
        ws.send(Message::Ping(Bytes::from_static(b"ka"))).await.unwrap();
        ws.send(Message::text("-setup".to_string())).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    let mut endpoint = WebSocketEndpoint::new(ws);

    let mut received = Vec::new();
    timeout(DEADLINE, endpoint.read_to_end(&mut received)).await.unwrap().unwrap();
    assert_eq!(received, b"xclock-setup");

    drop(endpoint);
    timeout(DEADLINE, peer).await.unwrap().unwrap();
}
