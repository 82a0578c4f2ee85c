//! The room identifier grammars, unified into one type.
//!
//! A room can be referenced three ways:
//!
//! - a 3-character compact code (`8QR`, case-insensitive, confusables OK)
//! - a friendly name (`brave-dragon`)
//! - a legacy 6-character alphanumeric code (`AB12CD`)
//!
//! The first two are the same room under the codec, so both canonicalize
//! to the compact code. Legacy codes predate the codec and canonicalize to
//! their uppercase form.

use std::fmt;
use std::str::FromStr;

use crate::codec::{self, CODE_LENGTH, RoomName};
use crate::IdentifierError;

/// Length of the legacy alphanumeric room code.
pub const LEGACY_CODE_LENGTH: usize = 6;

/// A parsed room identifier in the form the user supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomIdentifier {
    /// Parsed from a compact code.
    Compact(RoomName),
    /// Parsed from a `word-word` friendly name.
    Friendly(RoomName),
    /// A legacy 6-character code, stored uppercase.
    Legacy(String),
}

impl RoomIdentifier {
    /// Parses any accepted grammar.
    ///
    /// Friendly names are matched case-insensitively. Input that has the
    /// shape of a grammar but fails to encode or decode reports the codec
    /// error rather than [`IdentifierError::Unrecognized`].
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if trimmed.contains('-') {
            let lowered = trimmed.to_ascii_lowercase();
            return Ok(Self::Friendly(RoomName::parse(&lowered)?));
        }

        match trimmed.chars().count() {
            CODE_LENGTH => Ok(Self::Compact(codec::decode(trimmed)?)),
            LEGACY_CODE_LENGTH
                if trimmed.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                Ok(Self::Legacy(trimmed.to_ascii_uppercase()))
            }
            _ => Err(IdentifierError::Unrecognized(trimmed.to_string())),
        }
    }

    /// The form every reference to this room is keyed by: the compact
    /// code, or the uppercase legacy code.
    pub fn canonical(&self) -> String {
        match self {
            Self::Compact(name) | Self::Friendly(name) => name.code(),
            Self::Legacy(code) => code.clone(),
        }
    }

    /// The human-facing form: `word-word` where one exists.
    pub fn display_name(&self) -> String {
        match self {
            Self::Compact(name) | Self::Friendly(name) => name.to_string(),
            Self::Legacy(code) => code.clone(),
        }
    }

    /// The decoded name, unless this is a legacy code.
    pub fn room_name(&self) -> Option<RoomName> {
        match self {
            Self::Compact(name) | Self::Friendly(name) => Some(*name),
            Self::Legacy(_) => None,
        }
    }

    /// Returns `true` if both identifiers reference the same room.
    pub fn same_room(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl From<RoomName> for RoomIdentifier {
    fn from(name: RoomName) -> Self {
        Self::Friendly(name)
    }
}

impl FromStr for RoomIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoomIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
