//! Integration tests for the session driver against a bare WebSocket
//! server that plays the relay's role by hand.

use std::time::Duration;

use diceroom_protocol::{PlayerId, RoomMessage};
use diceroom_session::{
    ConnectionState, Notification, RollDraft, SessionClient, SessionConfig,
    SessionError,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

type ServerSocket = WebSocketStream<TcpStream>;

// =========================================================================
// Helpers
// =========================================================================

/// Accepts every upgrade and hands the sockets to the test.
async fn fake_relay() -> (String, mpsc::UnboundedReceiver<ServerSocket>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(stream).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });
    (format!("ws://{addr}"), rx)
}

fn config(relay_url: String) -> SessionConfig {
    SessionConfig {
        relay_url,
        reconnect_base_delay: Duration::from_millis(20),
        max_reconnect_attempts: 3,
        ..SessionConfig::default()
    }
}

async fn next_socket(rx: &mut mpsc::UnboundedReceiver<ServerSocket>) -> ServerSocket {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("client should connect")
        .expect("server running")
}

async fn next_message(ws: &mut ServerSocket) -> RoomMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame should arrive")
            .expect("socket open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("valid message");
        }
    }
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    mut pred: impl FnMut(&Notification) -> bool,
) -> Notification {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let n = rx.recv().await.expect("driver running");
            if pred(&n) {
                return n;
            }
        }
    })
    .await
    .expect("notification should arrive")
}

fn is_state(state: ConnectionState) -> impl FnMut(&Notification) -> bool {
    move |n| *n == Notification::StateChanged(state)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_client_announces_join_on_open() {
    let (url, mut sockets) = fake_relay().await;
    let (client, mut notes) = SessionClient::start(config(url), "<b>Ada</b>");

    client.connect("brave-dragon").unwrap();
    wait_for(&mut notes, is_state(ConnectionState::Connecting)).await;
    let mut ws = next_socket(&mut sockets).await;
    wait_for(&mut notes, is_state(ConnectionState::Connected)).await;

    match next_message(&mut ws).await {
        RoomMessage::JoinAnnouncement { player } => {
            assert_eq!(player.id, client.player().id);
            assert_eq!(player.display_name, "Ada");
        }
        other => panic!("expected join, got {other:?}"),
    }
    assert_eq!(client.state().await.unwrap(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_client_answers_ping_and_reports_peers() {
    let (url, mut sockets) = fake_relay().await;
    let (client, mut notes) = SessionClient::start(config(url), "Ada");
    client.connect("brave-dragon").unwrap();
    let mut ws = next_socket(&mut sockets).await;
    next_message(&mut ws).await; // own join

    ws.send(Message::text(r#"{"type":"PING"}"#)).await.unwrap();
    assert_eq!(next_message(&mut ws).await, RoomMessage::Pong);

    let peer = r#"{"type":"JOIN_ANNOUNCEMENT","player":{"id":"0000peer","displayName":"Bo","joinedAt":1,"lastSeen":1,"active":true}}"#;
    ws.send(Message::text(peer)).await.unwrap();
    assert!(matches!(
        next_message(&mut ws).await,
        RoomMessage::PlayerResponse { .. }
    ));
    wait_for(&mut notes, |n| matches!(n, Notification::PlayerJoined(_))).await;

    let peers = client.peers().await.unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].id, PlayerId::from("0000peer"));
}

#[tokio::test]
async fn test_client_reconnects_with_same_identity() {
    let (url, mut sockets) = fake_relay().await;
    let (client, mut notes) = SessionClient::start(config(url), "Ada");
    client.connect("brave-dragon").unwrap();

    let mut first = next_socket(&mut sockets).await;
    let first_id = match next_message(&mut first).await {
        RoomMessage::JoinAnnouncement { player } => player.id,
        other => panic!("expected join, got {other:?}"),
    };
    wait_for(&mut notes, is_state(ConnectionState::Connected)).await;

    // Unexpected close from the server side.
    drop(first);
    wait_for(&mut notes, is_state(ConnectionState::Connecting)).await;

    let mut second = next_socket(&mut sockets).await;
    match next_message(&mut second).await {
        RoomMessage::JoinAnnouncement { player } => assert_eq!(player.id, first_id),
        other => panic!("expected join, got {other:?}"),
    }
    wait_for(&mut notes, is_state(ConnectionState::Connected)).await;
}

#[tokio::test]
async fn test_client_disconnect_sends_leave_and_stays_down() {
    let (url, mut sockets) = fake_relay().await;
    let (client, mut notes) = SessionClient::start(config(url), "Ada");
    client.connect("brave-dragon").unwrap();
    let mut ws = next_socket(&mut sockets).await;
    next_message(&mut ws).await;
    wait_for(&mut notes, is_state(ConnectionState::Connected)).await;

    client.disconnect().unwrap();

    assert_eq!(
        next_message(&mut ws).await,
        RoomMessage::LeaveAnnouncement {
            player_id: client.player().id.clone()
        }
    );
    wait_for(&mut notes, is_state(ConnectionState::Disconnected)).await;

    let again =
        tokio::time::timeout(Duration::from_millis(300), sockets.recv()).await;
    assert!(again.is_err(), "no reconnect after a manual disconnect");
}

#[tokio::test]
async fn test_client_gives_up_after_retry_budget() {
    // Nothing listens on this port once the listener is dropped.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (client, mut notes) =
        SessionClient::start(config(format!("ws://{addr}")), "Ada");
    client.connect("brave-dragon").unwrap();

    wait_for(&mut notes, is_state(ConnectionState::Error)).await;
    assert_eq!(client.state().await.unwrap(), ConnectionState::Error);
}

#[tokio::test]
async fn test_client_roll_is_broadcast() {
    let (url, mut sockets) = fake_relay().await;
    let (client, mut notes) = SessionClient::start(config(url), "Ada");
    client.connect("brave-dragon").unwrap();
    let mut ws = next_socket(&mut sockets).await;
    next_message(&mut ws).await;
    wait_for(&mut notes, is_state(ConnectionState::Connected)).await;

    client
        .roll(RollDraft::new(15, "15").with_detail("rollType", "d20"))
        .unwrap();
    client.roll(RollDraft::new(2, "2").private()).unwrap();
    client.roll(RollDraft::new(6, "6")).unwrap();

    // The private roll never reaches the wire.
    let totals: Vec<i64> = [next_message(&mut ws).await, next_message(&mut ws).await]
        .into_iter()
        .map(|m| match m {
            RoomMessage::Roll { roll } => roll.total,
            other => panic!("expected roll, got {other:?}"),
        })
        .collect();
    assert_eq!(totals, vec![15, 6]);

    let history = client.history().await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].total, 6);
}

#[tokio::test]
async fn test_client_rejects_invalid_room() {
    let (client, _notes) =
        SessionClient::start(config("ws://127.0.0.1:9".into()), "Ada");
    let err = client.connect("not a room").unwrap_err();
    assert!(matches!(err, SessionError::InvalidRoom(_)));
    assert_eq!(
        client.state().await.unwrap(),
        ConnectionState::Disconnected
    );
}

#[tokio::test]
async fn test_client_teardown_stops_driver() {
    let (client, mut notes) =
        SessionClient::start(config("ws://127.0.0.1:9".into()), "Ada");
    client.teardown().unwrap();

    // The notification stream ends once the driver is gone.
    tokio::time::timeout(Duration::from_secs(1), async {
        while notes.recv().await.is_some() {}
    })
    .await
    .unwrap();
    assert!(matches!(client.state().await, Err(SessionError::Stopped)));
}
