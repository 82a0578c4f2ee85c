//! Per-connection handler: relay attach, heartbeat answers and fan-out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Attach to the room's relay (started on first use)
//!   2. Spawn a writer that drains frames the relay fans out to us
//!   3. Loop: answer `PING` directly, forward everything else verbatim
//!   4. Detach when the socket closes

use std::sync::Arc;

use diceroom_protocol::{Codec, RoomId, RoomMessage};
use diceroom_relay::RelayHandle;
use diceroom_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::DiceroomError;
use crate::server::ServerState;

/// Drop guard that detaches the connection from its relay when the
/// handler exits, including by panic.
struct RelayGuard {
    conn_id: ConnectionId,
    relay: RelayHandle,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let relay = self.relay.clone();
        tokio::spawn(async move {
            if relay.detach(conn_id).await.is_ok() {
                tracing::info!(%conn_id, room_id = %relay.room_id(), "connection detached");
            }
        });
    }
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), DiceroomError> {
    let conn_id = conn.id();
    let room_id = RoomId(conn.route().to_string());

    // The relay holds the only sender, so the writer ends once the
    // relay drops us (detach or shutdown).
    let (tx, rx) = mpsc::unbounded_channel();
    let relay = {
        let mut relays = state.relays.lock().await;
        relays.attach(&room_id, conn_id, tx).await?
    };
    let _guard = RelayGuard {
        conn_id,
        relay: relay.clone(),
    };
    tracing::info!(%conn_id, %room_id, "connection attached");

    tokio::spawn(write_frames(conn.clone(), rx));

    let pong = state.codec.encode(&RoomMessage::Pong)?;

    loop {
        let frame = match conn.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(%conn_id, "connection closed by peer");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "receive failed");
                break;
            }
        };

        match state.codec.decode::<RoomMessage>(&frame) {
            Ok(RoomMessage::Ping) => {
                conn.send(&pong).await?;
                continue;
            }
            Ok(message) => {
                tracing::debug!(%conn_id, kind = message.kind(), "forwarding");
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "forwarding unparsed frame");
            }
        }

        if let Err(e) = relay.forward(conn_id, frame).await {
            tracing::warn!(%conn_id, error = %e, "relay gone, closing connection");
            break;
        }
    }

    let _ = conn.close().await;
    Ok(())
}

/// Writes every frame the relay hands us until the relay lets go of
/// the sender or the socket fails.
async fn write_frames(
    conn: WebSocketConnection,
    mut rx: mpsc::UnboundedReceiver<Arc<str>>,
) {
    let conn_id = conn.id();
    while let Some(frame) = rx.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(%conn_id, error = %e, "send failed, dropping writer");
            return;
        }
    }
    let _ = conn.close().await;
}
