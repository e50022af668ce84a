//! Vantage Core
//!
//! Wires the session manager, credential gateway and storage together for
//! a host application. One [`Portal`] per running application is expected.

mod config;
mod error;
mod portal;

pub use config::Config;
pub use error::CoreError;
pub use portal::Portal;

// Re-export core components
pub use vantage_gateway::{
    AuthPayload, CredentialApi, CredentialGateway, Credentials, GatewayError, ProfileUpdate,
    RegisterRequest, User, UserConfig,
};
pub use vantage_session::{
    evaluate_route, GuardDecision, Session, SessionError, SessionEvent, SessionManager,
    SessionPhase,
};
pub use vantage_storage::{AuthStore, ChangeBus, Database, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
