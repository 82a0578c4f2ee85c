//! `DiceroomServer` builder and accept loop.
//!
//! Ties the layers together: the transport validates the request path
//! during the upgrade, and each accepted connection is handed to a
//! handler task that attaches it to its room's relay.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use diceroom_protocol::{Codec, JsonCodec};
use diceroom_relay::{RelayConfig, RelayManager, room_from_path};
use diceroom_transport::{
    DEFAULT_HANDSHAKE_TIMEOUT, Transport, TransportError, WebSocketTransport,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::DiceroomError;
use crate::handler::handle_connection;

/// Relay server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,

    /// Upgrades that take longer than this are dropped.
    pub handshake_timeout: Duration,

    /// Settings for every room relay.
    pub relay: RelayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            relay: RelayConfig::default(),
        }
    }
}

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) relays: Mutex<RelayManager>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,no_run
/// use diceroom::prelude::*;
///
/// # async fn start() -> Result<(), DiceroomError> {
/// let server = DiceroomServer::builder()
///     .bind("0.0.0.0:8787")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct DiceroomServerBuilder {
    config: ServerConfig,
}

impl DiceroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces every setting at once.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets the relay configuration.
    pub fn relay_config(mut self, config: RelayConfig) -> Self {
        self.config.relay = config;
        self
    }

    /// Binds the listener. Connections queue until [`DiceroomServer::run`].
    ///
    /// Request paths other than `/api/room/{id}`, and ids that match no
    /// room grammar, are refused during the upgrade with HTTP 400.
    pub async fn build(self) -> Result<DiceroomServer, DiceroomError> {
        let guard = |path: &str| {
            room_from_path(path)
                .map(|room| room.0)
                .map_err(|e| e.to_string())
        };
        let transport = WebSocketTransport::bind(
            &self.config.bind_addr,
            guard,
            self.config.handshake_timeout,
        )
        .await?;

        let state = Arc::new(ServerState {
            relays: Mutex::new(RelayManager::new(self.config.relay)),
            codec: JsonCodec,
        });

        Ok(DiceroomServer { transport, state })
    }
}

impl Default for DiceroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DiceroomServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl DiceroomServer {
    /// Creates a new builder.
    pub fn builder() -> DiceroomServerBuilder {
        DiceroomServerBuilder::new()
    }
}

impl<C: Codec> DiceroomServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), DiceroomError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then stops the
    /// listener and every room relay. Relay shutdown closes each
    /// connection's writer, which closes the socket.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), DiceroomError> {
        tracing::info!(local_addr = %self.local_addr(), "Diceroom relay running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(TransportError::Shutdown) => {
                        tracing::error!("listener stopped");
                        return Err(TransportError::Shutdown.into());
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        self.transport.shutdown().await?;
        self.state.relays.lock().await.shutdown_all().await;
        tracing::info!("Diceroom relay stopped");
        Ok(())
    }
}
