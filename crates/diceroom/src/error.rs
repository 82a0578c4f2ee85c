//! Unified error type for Diceroom.

use diceroom_names::IdentifierError;
use diceroom_protocol::ProtocolError;
use diceroom_relay::RelayError;
use diceroom_session::SessionError;
use diceroom_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` conversions let `?` lift sub-crate errors without
/// mapping at each call site.
#[derive(Debug, thiserror::Error)]
pub enum DiceroomError {
    /// Listener, upgrade, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Bad request path, or a room relay that stopped.
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Client-side session failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room identifier that matches no accepted form.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
}
