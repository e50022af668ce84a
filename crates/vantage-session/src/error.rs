//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// A gateway failure. The display string is the user-facing message.
    #[error("{0}")]
    Gateway(#[from] vantage_gateway::GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] vantage_storage::StorageError),
}
