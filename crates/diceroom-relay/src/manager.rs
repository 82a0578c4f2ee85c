//! Relay manager: creates relays on demand and routes connections to them.

use std::collections::HashMap;

use diceroom_protocol::RoomId;
use diceroom_transport::ConnectionId;

use crate::relay::spawn_relay;
use crate::{FrameSender, RelayConfig, RelayError, RelayHandle, RelayInfo};

/// Tracks one relay per room.
///
/// Rooms have no record anywhere else: a relay exists from the first
/// attach until its last connection leaves, at which point the actor
/// stops and the manager forgets it.
pub struct RelayManager {
    config: RelayConfig,
    relays: HashMap<RoomId, RelayHandle>,
}

impl RelayManager {
    /// Creates a new, empty manager.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            relays: HashMap::new(),
        }
    }

    /// Attaches a connection to the room's relay, starting one if needed.
    ///
    /// If the room's previous actor stopped between lookup and attach
    /// (it emptied out concurrently), a fresh actor is started.
    pub async fn attach(
        &mut self,
        room_id: &RoomId,
        conn_id: ConnectionId,
        sender: FrameSender,
    ) -> Result<RelayHandle, RelayError> {
        let handle = self.relay_for(room_id);
        match handle.attach(conn_id, sender.clone()).await {
            Ok(()) => Ok(handle),
            Err(RelayError::Unavailable(_)) => {
                tracing::debug!(%room_id, "relay stopped before attach, restarting");
                self.relays.remove(room_id);
                let handle = self.relay_for(room_id);
                handle.attach(conn_id, sender).await?;
                Ok(handle)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns info about a room's relay.
    pub async fn relay_info(
        &self,
        room_id: &RoomId,
    ) -> Result<RelayInfo, RelayError> {
        let handle = self
            .relays
            .get(room_id)
            .ok_or_else(|| RelayError::NotFound(room_id.clone()))?;
        handle.info().await
    }

    /// Forgets relays whose actors have stopped.
    pub fn prune(&mut self) {
        self.relays.retain(|_, handle| !handle.is_closed());
    }

    /// Stops every relay.
    pub async fn shutdown_all(&mut self) {
        for (room_id, handle) in self.relays.drain() {
            if handle.shutdown().await.is_ok() {
                tracing::info!(%room_id, "relay stopped");
            }
        }
    }

    /// Returns the number of live relays.
    pub fn room_count(&self) -> usize {
        self.relays.values().filter(|h| !h.is_closed()).count()
    }

    fn relay_for(&mut self, room_id: &RoomId) -> RelayHandle {
        self.prune();
        self.relays
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::info!(%room_id, "relay created");
                spawn_relay(room_id.clone(), &self.config)
            })
            .clone()
    }
}

impl Default for RelayManager {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}
