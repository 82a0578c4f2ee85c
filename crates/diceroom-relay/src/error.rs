//! Error types for the relay layer.

use diceroom_names::IdentifierError;
use diceroom_protocol::RoomId;
use diceroom_transport::ConnectionId;

/// Errors that can occur during relay operations.
///
/// The two request-path variants display as the exact plain-text body
/// sent back with HTTP 400.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The request path is not `/api/room/{id}`.
    #[error("Invalid session URL")]
    InvalidSessionUrl,

    /// The `{id}` segment matches no room identifier grammar.
    #[error("Invalid session ID format")]
    InvalidSessionId(#[source] IdentifierError),

    /// The connection is already attached to this relay.
    #[error("{0} already attached to {1}")]
    AlreadyAttached(ConnectionId, RoomId),

    /// No relay is running for the room.
    #[error("{0} has no relay")]
    NotFound(RoomId),

    /// The relay's command channel is closed (the actor stopped).
    #[error("{0} is unavailable")]
    Unavailable(RoomId),
}
