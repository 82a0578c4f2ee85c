//! Room relays for Diceroom.
//!
//! A relay is a pure fan-out multiplexer: every frame one connection in a
//! room sends is forwarded, untouched, to every *other* connection in the
//! same room. Relays hold no players, no history and no credentials.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! connection set, so no locks guard it.
//!
//! # Key types
//!
//! - [`RelayManager`] — lazily creates one relay per room, routes attaches
//! - [`RelayHandle`] — send commands to a running relay actor
//! - [`RelayConfig`] — actor settings
//! - [`room_from_path`] — validates `/api/room/{id}` request paths

mod config;
mod error;
mod manager;
mod relay;
mod route;

pub use config::RelayConfig;
pub use error::RelayError;
pub use manager::RelayManager;
pub use relay::{FrameSender, RelayHandle, RelayInfo};
pub use route::{ROOM_PATH_PREFIX, room_from_path};
