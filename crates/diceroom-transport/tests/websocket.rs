//! Integration tests for the WebSocket transport.
//!
//! Each test binds a real listener on an OS-assigned port and talks to it
//! with a `tokio-tungstenite` client (or a raw TCP socket, for the
//! non-upgrade case).

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use diceroom_transport::{
        Connection, DEFAULT_HANDSHAKE_TIMEOUT, EXPECTED_WEBSOCKET, Transport,
        WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_tungstenite::tungstenite::{self, Message};

    type ClientStream = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Accepts `/room/{key}` and rejects everything else.
    fn room_guard(path: &str) -> Result<String, String> {
        path.strip_prefix("/room/")
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| "Invalid session URL".to_string())
    }

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind(
            "127.0.0.1:0",
            room_guard,
            DEFAULT_HANDSHAKE_TIMEOUT,
        )
        .await
        .expect("should bind");
        let addr = transport.local_addr().to_string();
        (transport, addr)
    }

    async fn connect_client(addr: &str, path: &str) -> ClientStream {
        let url = format!("ws://{addr}{path}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let mut client = connect_client(&addr, "/room/abc").await;
        let server_conn = tokio::time::timeout(
            Duration::from_secs(2),
            transport.accept(),
        )
        .await
        .expect("accept should not time out")
        .expect("should accept");

        assert!(server_conn.id().into_inner() > 0);
        assert_eq!(server_conn.route(), "abc");

        // --- Server sends, client receives ---
        server_conn
            .send(r#"{"type":"PING"}"#)
            .await
            .expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"type":"PING"}"#);

        // --- Client sends, server receives ---
        client
            .send(Message::text(r#"{"type":"PONG"}"#))
            .await
            .unwrap();
        let received = server_conn.recv().await.expect("recv should succeed");
        assert_eq!(received.as_deref(), Some(r#"{"type":"PONG"}"#));

        // --- Client closes, server sees None ---
        client.close(None).await.unwrap();
        let after_close = server_conn.recv().await.expect("recv should succeed");
        assert_eq!(after_close, None);

        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_pending() {
        let (mut transport, addr) = bind().await;
        let mut client = connect_client(&addr, "/room/abc").await;
        let server_conn = transport.accept().await.unwrap();

        // Park a reader on a clone, then send through the original.
        let reader = server_conn.clone();
        let pending = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), server_conn.send("hi"))
            .await
            .expect("send must not wait for the reader")
            .unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "hi");

        client.send(Message::text("bye")).await.unwrap();
        let got = pending.await.unwrap().unwrap();
        assert_eq!(got.as_deref(), Some("bye"));
    }

    #[tokio::test]
    async fn test_websocket_binary_utf8_frame_is_read_as_text() {
        let (mut transport, addr) = bind().await;
        let mut client = connect_client(&addr, "/room/abc").await;
        let server_conn = transport.accept().await.unwrap();

        client
            .send(Message::Binary(b"not-really-binary".to_vec().into()))
            .await
            .unwrap();
        let got = server_conn.recv().await.unwrap();
        assert_eq!(got.as_deref(), Some("not-really-binary"));
    }

    #[tokio::test]
    async fn test_websocket_rejected_route_returns_400_with_reason() {
        let (_transport, addr) = bind().await;

        let url = format!("ws://{addr}/elsewhere");
        let err = tokio_tungstenite::connect_async(&url)
            .await
            .expect_err("upgrade should be refused");

        match err {
            tungstenite::Error::Http(response) => {
                assert_eq!(response.status(), 400);
                let body = response.body().clone().unwrap_or_default();
                assert_eq!(
                    String::from_utf8_lossy(&body),
                    "Invalid session URL"
                );
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_websocket_plain_http_request_gets_expected_websocket() {
        let (_transport, addr) = bind().await;

        let mut stream = tokio::net::TcpStream::connect(&addr).await.unwrap();
        stream
            .write_all(b"GET /room/abc HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        tokio::time::timeout(
            Duration::from_secs(2),
            stream.read_to_string(&mut response),
        )
        .await
        .expect("server should answer")
        .unwrap();

        assert!(response.starts_with("HTTP/1.1 400"), "got: {response}");
        assert!(response.ends_with(EXPECTED_WEBSOCKET), "got: {response}");
    }

    /// Sends `head` on a raw socket and returns everything the server
    /// writes back before closing.
    async fn raw_exchange(addr: &str, head: &[u8]) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(head).await.unwrap();
        let mut response = String::new();
        tokio::time::timeout(
            Duration::from_secs(2),
            stream.read_to_string(&mut response),
        )
        .await
        .expect("server should answer")
        .unwrap();
        response
    }

    #[tokio::test]
    async fn test_websocket_upgrade_header_alone_gets_expected_websocket() {
        let (_transport, addr) = bind().await;

        let response = raw_exchange(
            &addr,
            b"GET /room/abc HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 400"), "got: {response}");
        assert!(response.ends_with(EXPECTED_WEBSOCKET), "got: {response}");
    }

    #[tokio::test]
    async fn test_websocket_missing_key_gets_expected_websocket() {
        let (_transport, addr) = bind().await;

        let response = raw_exchange(
            &addr,
            b"GET /room/abc HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\n\
              Connection: Upgrade\r\nSec-WebSocket-Version: 13\r\n\r\n",
        )
        .await;

        assert!(response.starts_with("HTTP/1.1 400"), "got: {response}");
        assert!(response.ends_with(EXPECTED_WEBSOCKET), "got: {response}");
    }

    #[tokio::test]
    async fn test_websocket_head_split_across_writes_still_upgrades() {
        let (mut transport, addr) = bind().await;

        let mut stream = tokio::net::TcpStream::connect(&addr).await.unwrap();
        stream
            .write_all(b"GET /room/abc HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream
            .write_all(
                b"Connection: Upgrade\r\nSec-WebSocket-Version: 13\r\n\
                  Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n",
            )
            .await
            .unwrap();

        let conn = tokio::time::timeout(Duration::from_secs(2), transport.accept())
            .await
            .expect("accept should not time out")
            .expect("should accept");
        assert_eq!(conn.route(), "abc");

        let mut response = vec![0u8; 512];
        let n = stream.read(&mut response).await.unwrap();
        let response = String::from_utf8_lossy(&response[..n]);
        assert!(response.starts_with("HTTP/1.1 101"), "got: {response}");
    }

    #[tokio::test]
    async fn test_websocket_silent_client_does_not_block_others() {
        let transport = WebSocketTransport::bind(
            "127.0.0.1:0",
            room_guard,
            Duration::from_millis(200),
        )
        .await
        .unwrap();
        let addr = transport.local_addr().to_string();
        let mut transport = transport;

        // Opens TCP but never sends a request.
        let _silent = tokio::net::TcpStream::connect(&addr).await.unwrap();

        let _client = connect_client(&addr, "/room/second").await;
        let conn = tokio::time::timeout(
            Duration::from_secs(1),
            transport.accept(),
        )
        .await
        .expect("second client should be accepted")
        .unwrap();
        assert_eq!(conn.route(), "second");
    }

    #[tokio::test]
    async fn test_websocket_server_close() {
        let (mut transport, addr) = bind().await;
        let mut client = connect_client(&addr, "/room/abc").await;
        let server_conn = transport.accept().await.unwrap();

        server_conn.close().await.expect("close should succeed");

        let msg = client.next().await;
        match msg {
            Some(Ok(Message::Close(_))) | None => {}
            other => panic!("expected close, got {other:?}"),
        }
    }
}
