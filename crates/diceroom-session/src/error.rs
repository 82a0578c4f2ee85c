//! Error types for the session client.

use diceroom_names::IdentifierError;

/// Errors returned by [`SessionClient`](crate::SessionClient) operations.
///
/// Transport failures are not errors here: they feed the reconnection
/// policy and reach the caller only as state changes.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The room identifier matches no accepted grammar.
    #[error("invalid room: {0}")]
    InvalidRoom(#[from] IdentifierError),

    /// The driver task has exited (torn down, or every handle dropped).
    #[error("session client stopped")]
    Stopped,
}
