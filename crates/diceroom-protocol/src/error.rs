//! Error types for the protocol layer.
//!
//! Each crate in Diceroom defines its own error enum, so a
//! `ProtocolError` always means a frame could not be turned into (or out
//! of) a message, never a network or room problem.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into a frame).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a frame into a Rust value).
    ///
    /// Common causes: malformed JSON, an unknown `type` tag, or missing
    /// required fields. Receivers log and drop such frames.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
