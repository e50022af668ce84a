//! Vantage Credential Gateway
//!
//! HTTP boundary for authentication-related backend calls. Every transport
//! failure, non-2xx status and malformed body is normalized into
//! [`GatewayError`]; raw client errors never cross this boundary.

mod api;
mod client;
mod error;
mod types;

pub use api::CredentialApi;
pub use client::CredentialGateway;
pub use error::GatewayError;
pub use types::{AuthPayload, Credentials, ProfileUpdate, RegisterRequest, User, UserConfig};

pub type Result<T> = std::result::Result<T, GatewayError>;
