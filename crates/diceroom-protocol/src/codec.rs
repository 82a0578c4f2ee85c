//! Codec trait and implementations for turning messages into frames.
//!
//! Frames are text: the wire format is one UTF-8 JSON object per
//! WebSocket text frame, so codecs produce and consume `String`/`&str`
//! rather than raw bytes.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to text frames and decode them
/// back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task on a runtime.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or does
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses compact JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use diceroom_protocol::{Codec, JsonCodec, RoomMessage};
///
/// let codec = JsonCodec;
/// let frame = codec.encode(&RoomMessage::Ping).unwrap();
/// assert_eq!(frame, r#"{"type":"PING"}"#);
///
/// let decoded: RoomMessage = codec.decode(&frame).unwrap();
/// assert_eq!(decoded, RoomMessage::Ping);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        frame: &str,
    ) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}
