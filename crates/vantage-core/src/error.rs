//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] vantage_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] vantage_session::SessionError),

    #[error("{0}")]
    Gateway(#[from] vantage_gateway::GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in")]
    NotAuthenticated,
}
