//! Relay actor: an isolated Tokio task that owns one room's connections.
//!
//! Each room runs in its own task, communicating with connection handlers
//! through an mpsc channel. The connection set is only ever touched by
//! that task.

use std::collections::HashMap;
use std::sync::Arc;

use diceroom_protocol::RoomId;
use diceroom_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::{RelayConfig, RelayError};

/// Channel sender delivering frames to one connection's writer task.
///
/// Unbounded so the actor never waits on a slow socket; frames are shared
/// `Arc<str>` so fan-out doesn't copy them per connection.
pub type FrameSender = mpsc::UnboundedSender<Arc<str>>;

/// Commands sent to a relay actor through its channel.
pub(crate) enum RelayCommand {
    /// Add a connection to the room.
    Attach {
        conn_id: ConnectionId,
        sender: FrameSender,
        reply: oneshot::Sender<Result<(), RelayError>>,
    },

    /// Remove a connection from the room.
    Detach { conn_id: ConnectionId },

    /// Forward a frame to everyone except its sender.
    Forward {
        from: ConnectionId,
        frame: Arc<str>,
    },

    /// Request a snapshot of the relay.
    Info { reply: oneshot::Sender<RelayInfo> },

    /// Stop the relay.
    Shutdown,
}

/// A snapshot of relay metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayInfo {
    /// The room this relay serves.
    pub room_id: RoomId,
    /// Number of connections currently attached.
    pub connections: usize,
}

/// Handle to a running relay actor.
///
/// Cheap to clone; it wraps an `mpsc::Sender`.
#[derive(Clone)]
pub struct RelayHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    /// Returns the room this relay serves.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Adds a connection; frames from other connections will be pushed
    /// into `sender` from now on.
    pub async fn attach(
        &self,
        conn_id: ConnectionId,
        sender: FrameSender,
    ) -> Result<(), RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RelayCommand::Attach {
                conn_id,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a connection. Detaching an unknown connection is a no-op.
    pub async fn detach(&self, conn_id: ConnectionId) -> Result<(), RelayError> {
        self.sender
            .send(RelayCommand::Detach { conn_id })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Forwards `frame` to every other connection (fire-and-forget).
    pub async fn forward(
        &self,
        from: ConnectionId,
        frame: impl Into<Arc<str>>,
    ) -> Result<(), RelayError> {
        self.sender
            .send(RelayCommand::Forward {
                from,
                frame: frame.into(),
            })
            .await
            .map_err(|_| self.unavailable())
    }

    /// Requests the current relay info.
    pub async fn info(&self) -> Result<RelayInfo, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RelayCommand::Info { reply: reply_tx })
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Tells the relay to stop. Attached writers see their channel close.
    pub async fn shutdown(&self) -> Result<(), RelayError> {
        self.sender
            .send(RelayCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RelayError {
        RelayError::Unavailable(self.room_id.clone())
    }
}

/// The internal relay state. Runs inside a Tokio task.
struct RelayActor {
    room_id: RoomId,
    connections: HashMap<ConnectionId, FrameSender>,
    receiver: mpsc::Receiver<RelayCommand>,
}

impl RelayActor {
    /// Processes commands until shutdown or until the room empties.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, "relay actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RelayCommand::Attach {
                    conn_id,
                    sender,
                    reply,
                } => {
                    let result = self.handle_attach(conn_id, sender);
                    let _ = reply.send(result);
                }
                RelayCommand::Detach { conn_id } => {
                    self.handle_detach(conn_id);
                }
                RelayCommand::Forward { from, frame } => {
                    self.handle_forward(from, frame);
                }
                RelayCommand::Info { reply } => {
                    let _ = reply.send(self.info());
                }
                RelayCommand::Shutdown => {
                    tracing::info!(room_id = %self.room_id, "relay shutting down");
                    break;
                }
            }

            if self.connections.is_empty() {
                tracing::debug!(room_id = %self.room_id, "room empty");
                break;
            }
        }

        tracing::info!(room_id = %self.room_id, "relay actor stopped");
    }

    fn handle_attach(
        &mut self,
        conn_id: ConnectionId,
        sender: FrameSender,
    ) -> Result<(), RelayError> {
        if self.connections.contains_key(&conn_id) {
            return Err(RelayError::AlreadyAttached(
                conn_id,
                self.room_id.clone(),
            ));
        }
        self.connections.insert(conn_id, sender);
        tracing::info!(
            room_id = %self.room_id,
            %conn_id,
            connections = self.connections.len(),
            "connection attached"
        );
        Ok(())
    }

    fn handle_detach(&mut self, conn_id: ConnectionId) {
        if self.connections.remove(&conn_id).is_some() {
            tracing::info!(
                room_id = %self.room_id,
                %conn_id,
                connections = self.connections.len(),
                "connection detached"
            );
        }
    }

    /// Sends `frame` to every connection except `from`. A connection whose
    /// channel is closed is dropped from the set.
    fn handle_forward(&mut self, from: ConnectionId, frame: Arc<str>) {
        let room_id = &self.room_id;
        let mut delivered = 0usize;
        self.connections.retain(|conn_id, sender| {
            if *conn_id == from {
                return true;
            }
            match sender.send(Arc::clone(&frame)) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    tracing::warn!(%room_id, %conn_id, "dead connection removed");
                    false
                }
            }
        });
        tracing::debug!(
            room_id = %self.room_id,
            %from,
            delivered,
            "frame forwarded"
        );
    }

    fn info(&self) -> RelayInfo {
        RelayInfo {
            room_id: self.room_id.clone(),
            connections: self.connections.len(),
        }
    }
}

/// Spawns a relay actor for `room_id` and returns a handle to it.
///
/// The actor stops by itself once its last connection leaves, so a
/// handle must be attached to promptly after spawning.
pub(crate) fn spawn_relay(room_id: RoomId, config: &RelayConfig) -> RelayHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer.max(1));

    let actor = RelayActor {
        room_id: room_id.clone(),
        connections: HashMap::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RelayHandle {
        room_id,
        sender: tx,
    }
}
