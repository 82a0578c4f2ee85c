//! Wire protocol for Diceroom.
//!
//! This crate defines the "language" that room clients speak to each
//! other through the relay:
//!
//! - **Types** ([`RoomMessage`], [`Player`], [`RollRecord`], [`PlayerId`],
//!   [`RoomId`]) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to and from text frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! ```text
//! Transport (text frames) → Protocol (RoomMessage) → Session client
//! ```
//!
//! The relay sits on the transport side of this picture: it moves frames
//! between connections and never needs the types defined here, except to
//! answer `PING`.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Player, PlayerId, RollRecord, RoomId, RoomMessage};
