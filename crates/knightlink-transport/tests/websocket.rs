//! WebSocket transport against a real `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use std::time::Duration;

    use knightlink_transport::{
        Connection, Incoming, Transport, TransportError, WebSocketConnection,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Opens a listener on a free port, connects one client to `target`,
    /// and returns both ends.
    async fn open(target: &str) -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        let accepting = tokio::spawn(async move {
            transport.accept().await.expect("tcp accept").upgrade().await
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{target}"))
            .await
            .expect("client handshake");
        let server = accepting
            .await
            .expect("accept task")
            .expect("server handshake");
        (server, client)
    }

    #[tokio::test]
    async fn test_silent_client_does_not_block_next_accept() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = transport.local_addr().unwrap();

        // Connects but never sends an upgrade request.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let stalled = transport.accept().await.unwrap();

        let client = tokio::spawn(tokio_tungstenite::connect_async(format!(
            "ws://{addr}/play-online?cid=u1"
        )));
        let next = tokio::time::timeout(Duration::from_secs(2), async {
            transport.accept().await.unwrap().upgrade().await
        })
        .await
        .expect("second client must not wait behind the silent one")
        .unwrap();

        assert_ne!(next.id(), stalled.id());
        assert_eq!(next.request_target(), "/play-online?cid=u1");
        client.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_upgrade_times_out_for_silent_client() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .unwrap()
            .with_handshake_timeout(Duration::from_millis(100));
        let addr = transport.local_addr().unwrap();

        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let incoming = transport.accept().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), incoming.upgrade())
            .await
            .expect("upgrade should give up on its own");
        assert!(matches!(result, Err(TransportError::HandshakeTimeout(_))));
    }

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (server, mut client) = open("/play-online").await;

        server.send(r#"{"type":"waitingForOpponent"}"#).await.unwrap();
        let frame = client.next().await.unwrap().unwrap();
        assert_eq!(
            frame.into_text().unwrap().as_str(),
            r#"{"type":"waitingForOpponent"}"#
        );

        client
            .send(Message::Text(r#"{"type":"chatMessage","text":"hi"}"#.to_owned().into()))
            .await
            .unwrap();
        assert_eq!(
            server.recv().await.unwrap().as_deref(),
            Some(r#"{"type":"chatMessage","text":"hi"}"#)
        );

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_request_target_keeps_path_and_query() {
        let (server, _client) = open("/play-with-friend/ABC123?cid=u1").await;
        assert_eq!(server.request_target(), "/play-with-friend/ABC123?cid=u1");
    }

    #[tokio::test]
    async fn test_accepted_connections_get_distinct_ids() {
        let (first, _c1) = open("/").await;
        let (second, _c2) = open("/").await;
        assert_ne!(first.id(), second.id());
    }

    #[tokio::test]
    async fn test_utf8_binary_frame_reads_as_text() {
        let (server, mut client) = open("/").await;

        client
            .send(Message::Binary(b"{\"type\":\"move\"}".to_vec().into()))
            .await
            .unwrap();
        assert_eq!(
            server.recv().await.unwrap().as_deref(),
            Some("{\"type\":\"move\"}")
        );
    }

    #[tokio::test]
    async fn test_send_is_not_blocked_by_pending_recv() {
        let (server, mut client) = open("/").await;
        let server = std::sync::Arc::new(server);

        // Park a reader first; it holds the read half until a frame arrives.
        let reader = {
            let server = std::sync::Arc::clone(&server);
            tokio::spawn(async move { server.recv().await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            server.send(r#"{"type":"friendLeft"}"#),
        )
        .await
        .expect("send must not wait for the reader")
        .unwrap();
        assert!(client.next().await.unwrap().unwrap().is_text());

        client.send(Message::Close(None)).await.unwrap();
        assert!(reader.await.unwrap().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_client_close_reads_as_none() {
        let (server, mut client) = open("/").await;

        client.send(Message::Close(None)).await.unwrap();
        assert!(server.recv().await.unwrap().is_none());
    }
}
