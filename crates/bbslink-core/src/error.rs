//! Error types for the session core.
//!
//! Connection lifecycle violations are reported as [`ConnectionError`];
//! persistence failures live in [`crate::storage::StorageError`].

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors from the connection lifecycle state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation not allowed in the current state
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: String,
    },

    /// Target host was empty
    #[error("no host given")]
    EmptyHost,
}

impl ConnectionError {
    /// Whether the user should be told "already connected" rather than a
    /// generic failure.
    #[must_use]
    pub fn is_already_connected(&self) -> bool {
        matches!(
            self,
            Self::InvalidState {
                state: ConnectionState::Connecting | ConnectionState::Connected,
                ..
            }
        )
    }
}
