//! Client-side room sessions for Diceroom.
//!
//! The relay only forwards frames, so everything a room "knows" lives in
//! its clients. This crate is that client:
//!
//! - [`Session`] — a sans-IO state machine. Feed it [`Event`]s, carry out
//!   the [`Command`]s it returns. Deterministic and testable without
//!   sockets or real time.
//! - [`SessionClient`] — a Tokio driver around [`Session`] that owns the
//!   WebSocket connection and the timers, and reports [`Notification`]s.
//!
//! Supporting pieces are public for callers that want to build their own
//! driver: [`PeerMap`], [`RollHistory`] and the history-keeper election
//! in [`election`].

mod client;
mod config;
pub mod election;
mod error;
mod history;
mod machine;
mod peers;
mod player;

pub use client::SessionClient;
pub use config::{ConnectionState, SessionConfig};
pub use error::SessionError;
pub use history::{RollDraft, RollHistory};
pub use machine::{Command, Event, Health, Notification, Session, Timer};
pub use peers::PeerMap;
pub use player::{
    Clock, DEFAULT_DISPLAY_NAME, MAX_DISPLAY_NAME_CHARS, SystemClock,
    generate_player_id, sanitize_display_name,
};
