//! Error types for room-name encoding and identifier parsing.

/// Errors raised by the room-name codec.
///
/// Encoding and decoding are pure functions, so every failure is a
/// problem with the input itself. Callers that only need something to
/// display should use the fallback helpers in [`crate::codec`] instead of
/// handling these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// A word is not in the vocabulary for the position it was used in.
    #[error("unknown word: {0:?}")]
    UnknownWord(String),

    /// A subject-subject name repeats the same subject twice.
    #[error("duplicate subject pair: {0}-{0}")]
    DuplicatePair(String),

    /// A code character is outside the base-32 alphabet, even after
    /// normalizing confusable characters.
    #[error("invalid code character {0:?}")]
    InvalidCharacter(char),

    /// A code has the wrong number of characters.
    #[error("code must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The decoded index does not address a word pair.
    #[error("decoded index {0} is out of range")]
    IndexOutOfRange(u32),

    /// A friendly name is not of the form `word-word`.
    #[error("malformed room name: {0:?}")]
    MalformedName(String),
}

/// Errors raised when a string matches none of the room identifier
/// grammars.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    /// The input is empty (after trimming).
    #[error("room identifier is empty")]
    Empty,

    /// The input looks like a compact code or friendly name but does not
    /// decode or encode.
    #[error(transparent)]
    Name(#[from] NameError),

    /// The input matches no accepted grammar at all.
    #[error("unrecognized room identifier: {0:?}")]
    Unrecognized(String),
}
