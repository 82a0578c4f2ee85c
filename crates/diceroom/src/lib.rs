//! # Diceroom
//!
//! Shared dice rooms for tabletop play.
//!
//! A room is nothing but a name and a relay. The relay forwards every
//! frame a player sends to everyone else in the same room and keeps no
//! record of anything; players, roll history and who answers late
//! joiners are all worked out by the clients.
//!
//! - [`DiceroomServer`] runs the relay: `GET /api/room/{id}` upgrades to
//!   a WebSocket attached to that room.
//! - [`SessionClient`](diceroom_session::SessionClient) is the client
//!   side: join, roll, reconnect, share history.
//! - Room names like `brave-dragon` map to 3-character codes through
//!   [`diceroom_names`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use diceroom::prelude::*;
//!
//! # async fn start() -> Result<(), DiceroomError> {
//! let server = DiceroomServer::builder()
//!     .bind("0.0.0.0:8787")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::DiceroomError;
pub use server::{DiceroomServer, DiceroomServerBuilder, ServerConfig};

pub use diceroom_names as names;
pub use diceroom_protocol as protocol;
pub use diceroom_relay as relay;
pub use diceroom_session as session;
pub use diceroom_transport as transport;

/// The types most programs need, in one import.
pub mod prelude {
    pub use crate::{
        DiceroomError, DiceroomServer, DiceroomServerBuilder, ServerConfig,
    };
    pub use diceroom_names::{RoomIdentifier, generate_room_name};
    pub use diceroom_protocol::{
        Player, PlayerId, RollRecord, RoomId, RoomMessage,
    };
    pub use diceroom_relay::RelayConfig;
    pub use diceroom_session::{
        ConnectionState, Health, Notification, RollDraft, SessionClient,
        SessionConfig,
    };
}
