//! Room names for Diceroom.
//!
//! Rooms have no server-side record, so their names must carry all the
//! information needed to find them. This crate provides:
//!
//! - **Codec** ([`encode`], [`decode`], [`RoomName`]) — a bijection
//!   between memorable two-word names and 3-character codes.
//! - **Fallbacks** ([`code_for`], [`display_name_for`]) — conversions for
//!   display code that never fail.
//! - **Identifiers** ([`RoomIdentifier`]) — one type for every way a room
//!   can be referenced, with a single canonical form.
//! - **Generator** ([`generate_room_name`], [`random_name`]) — fresh names
//!   for new rooms.

mod codec;
mod error;
mod generator;
mod identifier;
pub mod words;

pub use codec::{
    ALPHABET, CODE_LENGTH, NameForm, RoomName, code_for, decode,
    display_name_for, encode, normalize,
};
pub use error::{IdentifierError, NameError};
pub use generator::{
    DEFAULT_SUBJECT_PAIR_PROBABILITY, generate_room_name, random_name,
};
pub use identifier::{LEGACY_CODE_LENGTH, RoomIdentifier};
