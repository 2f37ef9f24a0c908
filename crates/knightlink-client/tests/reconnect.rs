//! Integration tests for `GameClient` against a scripted WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use knightlink_client::{
    ClientConfig, ClientError, GameClient, Intent, LinkStatus, ReconnectPolicy,
};
use knightlink_protocol::{ClientIdentity, Message, RoomCode};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};

/// Short delays so the backoff does not slow the tests down.
fn fast_policy(max_retries: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        base_delay: Duration::from_millis(10),
        max_retries,
    }
}

/// Accepts one WebSocket upgrade and returns the stream plus the request
/// target the client used.
async fn accept(
    listener: &TcpListener,
) -> (
    tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    String,
) {
    let (tcp, _) = listener.accept().await.expect("tcp accept");
    let mut target = String::new();
    let ws = tokio_tungstenite::accept_hdr_async(
        tcp,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            target = req.uri().to_string();
            Ok(resp)
        },
    )
    .await
    .expect("handshake");
    (ws, target)
}

#[tokio::test]
async fn test_client_reconnects_with_same_route_and_identity() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First connection: drop it straight away.
        let (ws, first) = accept(&listener).await;
        drop(ws);

        // Second connection: greet and echo one chat line back.
        let (mut ws, second) = accept(&listener).await;
        let greeting = r#"{"type":"waitingForFriend","roomId":"ABC123"}"#;
        ws.send(WsMessage::Text(greeting.to_owned().into()))
            .await
            .unwrap();
        let echoed = ws.next().await.unwrap().unwrap();
        ws.send(echoed).await.unwrap();
        (first, second, ws)
    });

    let config = ClientConfig::new(
        format!("ws://{addr}"),
        Intent::Room(RoomCode::new("ABC123")),
    )
    .with_identity(ClientIdentity::new("u1"))
    .with_policy(fast_policy(3));
    let client = GameClient::new(config);
    let status = client.status();

    let (to_server, outgoing) = mpsc::channel(8);
    let (incoming, mut from_server) = mpsc::unbounded_channel();
    let run = tokio::spawn(client.run(outgoing, incoming));

    let first = tokio::time::timeout(Duration::from_secs(2), from_server.recv())
        .await
        .expect("should receive after reconnect")
        .unwrap();
    assert_eq!(
        first,
        Message::WaitingForFriend {
            room_id: RoomCode::new("ABC123")
        }
    );
    assert_eq!(*status.borrow(), LinkStatus::Connected);

    to_server
        .send(Message::ChatMessage { text: "hi".into() })
        .await
        .unwrap();
    let echoed = tokio::time::timeout(Duration::from_secs(2), from_server.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, Message::ChatMessage { text: "hi".into() });

    let (first_target, second_target, _ws) = server.await.unwrap();
    assert_eq!(first_target, "/play-with-friend/ABC123?cid=u1");
    assert_eq!(first_target, second_target);

    // Closing the outgoing side is a user exit.
    drop(to_server);
    let result = tokio::time::timeout(Duration::from_secs(2), run)
        .await
        .expect("run should finish")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(*status.borrow(), LinkStatus::Closed);
}

#[tokio::test]
async fn test_client_gives_up_when_server_unreachable() {
    // Grab a free port, then close it so every connect is refused.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let config = ClientConfig::new(format!("ws://{addr}"), Intent::Random)
        .with_policy(fast_policy(2));
    let client = GameClient::new(config);
    let status = client.status();

    let (_to_server, outgoing) = mpsc::channel(1);
    let (incoming, _from_server) = mpsc::unbounded_channel();

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        client.run(outgoing, incoming),
    )
    .await
    .expect("should give up quickly");

    assert!(matches!(
        result,
        Err(ClientError::ConnectionLost { attempts: 2, .. })
    ));
    assert_eq!(*status.borrow(), LinkStatus::Lost);
}
