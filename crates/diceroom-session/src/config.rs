//! Session configuration and connection state machine.

use std::fmt;
use std::time::Duration;

use diceroom_names::RoomIdentifier;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for a room session.
///
/// Defaults match what browser clients use; tests shrink the durations.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the relay, without the `/api/room/...` path.
    pub relay_url: String,

    /// How often to send `PING` while connected.
    pub heartbeat_interval: Duration,

    /// How long to wait for the `PONG` before marking the link stale.
    pub ping_timeout: Duration,

    /// With no `PONG` for this long, [`Health`](crate::Health) reports
    /// `Stale`.
    pub stale_after: Duration,

    /// First reconnect delay; attempt `n` waits `base * 2^n`.
    pub reconnect_base_delay: Duration,

    /// Automatic reconnects before giving up and entering `Error`.
    pub max_reconnect_attempts: u32,

    /// Rolls kept in local history.
    pub history_limit: usize,

    /// Delay between a peer joining and running the history-keeper
    /// election, so peer maps can converge first.
    pub election_settle: Duration,
}

impl SessionConfig {
    /// The WebSocket URL for `room`, keyed by its canonical form.
    pub fn room_url(&self, room: &RoomIdentifier) -> String {
        format!(
            "{}/api/room/{}",
            self.relay_url.trim_end_matches('/'),
            room.canonical()
        )
    }

    /// Backoff before reconnect attempt `attempt` (zero-based).
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        self.reconnect_base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:8787".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(10),
            stale_after: Duration::from_secs(60),
            reconnect_base_delay: Duration::from_secs(1),
            max_reconnect_attempts: 5,
            history_limit: 50,
            election_settle: Duration::from_millis(500),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Where the session's connection to the relay stands.
///
/// ```text
///   Disconnected ──→ Connecting ──→ Connected
///        ↑  ↑           ↑  │            │
///        │  │           │  ↓            │
///        │  └──────── Error ←───────────┘
///        └──────────(manual disconnect)──┘
/// ```
///
/// - **Disconnected**: no room, or the user left. Nothing is retried.
/// - **Connecting**: an open is in flight or a reconnect is scheduled.
/// - **Connected**: the socket is open and the join was announced.
/// - **Error**: the retry budget ran out. Waits for a manual reconnect or
///   a focus event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Error)
                | (Connecting, Disconnected)
                | (Connected, Connecting)
                | (Connected, Error)
                | (Connected, Disconnected)
                | (Error, Connecting)
                | (Error, Disconnected)
        )
    }

    /// Returns `true` while the session wants a live connection.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}
