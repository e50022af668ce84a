//! Gateway trait
//!
//! The seam the session layer consumes. The production implementation is
//! [`crate::CredentialGateway`]; tests script their own.

use async_trait::async_trait;

use crate::types::{AuthPayload, Credentials, ProfileUpdate, RegisterRequest, User, UserConfig};
use crate::Result;

#[async_trait]
pub trait CredentialApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload>;

    /// Exchange a third-party OAuth access token for a session.
    async fn login_with_google(&self, access_token: &str) -> Result<AuthPayload>;

    async fn logout(&self, token: &str) -> Result<()>;

    /// Fetch the current user record. Doubles as the token-validity probe:
    /// an `Unauthorized` result means the cached session is stale.
    async fn current_user(&self, token: &str) -> Result<User>;

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<ProfileUpdate>;

    async fn user_config(&self, token: &str) -> Result<UserConfig>;

    async fn create_user_config(&self, token: &str, config: &UserConfig) -> Result<UserConfig>;

    async fn update_user_config(&self, token: &str, config: &UserConfig) -> Result<UserConfig>;
}
