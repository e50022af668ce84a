//! Gateway error types
//!
//! One uniform, message-bearing error kind per failure class. The display
//! string is the user-facing message.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The backend rejected the request payload before authenticating.
    /// Carries the backend's message verbatim.
    #[error("{0}")]
    Validation(String),

    /// The backend rejected the credentials with a known code.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// An authenticated request was refused; the cached session is stale.
    #[error("Your session has expired, please sign in again")]
    Unauthorized,

    /// Network failure, timeout, unrecognized non-2xx status, or a success
    /// body that failed to decode.
    #[error("{0}")]
    Transport(String),
}

impl GatewayError {
    /// True for the stale-session signal that must force a local logout.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized)
    }

    /// True for failures that leave the session in the error state rather
    /// than plain unauthenticated.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}
