//! Transport abstraction layer for Diceroom.
//!
//! Provides the [`Transport`] and [`Connection`] traits that the relay
//! server is written against, plus a [`RouteGuard`] hook that decides,
//! from the request path alone, whether an upgrade may proceed and which
//! route (room) the connection belongs to.
//!
//! Frames are UTF-8 text; the wire format has no binary framing.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_HANDSHAKE_TIMEOUT, EXPECTED_WEBSOCKET, WebSocketConnection,
    WebSocketTransport,
};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Maps an upgrade request path to a route key, or to the plain-text
/// reason the request is refused with HTTP 400.
///
/// Implemented for any `Fn(&str) -> Result<String, String>`, so a closure
/// is enough for simple cases.
pub trait RouteGuard: Send + Sync + 'static {
    /// Validates `path` (no query string) and returns the route key.
    fn route(&self, path: &str) -> Result<String, String>;
}

impl<F> RouteGuard for F
where
    F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
{
    fn route(&self, path: &str) -> Result<String, String> {
        self(path)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next fully upgraded connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that can send and receive text frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, frame: &str) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the route key the [`RouteGuard`] assigned at upgrade time.
    fn route(&self) -> &str;
}
