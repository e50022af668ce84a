//! Application facade
//!
//! Owns the storage, gateway and session manager for one running
//! application and hands the session manager to the UI layer. No global
//! state: the host constructs a `Portal` at startup and passes it down.

use std::sync::Arc;
use std::time::Duration;

use vantage_gateway::{CredentialApi, CredentialGateway, UserConfig};
use vantage_session::{evaluate_route, GuardDecision, Session, SessionManager};
use vantage_storage::{AuthStore, ChangeBus, Database};

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

pub struct Portal {
    config: Config,
    db: Database,
    gateway: Arc<dyn CredentialApi>,
    session_manager: SessionManager,
}

impl Portal {
    /// Initialize a new application instance
    pub fn new(config: Config) -> Result<Self> {
        Self::with_change_bus(config, ChangeBus::new())
    }

    /// Initialize sharing a change bus with other contexts (e.g. windows)
    /// over the same database, so a logout in one is observed by all.
    pub fn with_change_bus(config: Config, bus: ChangeBus) -> Result<Self> {
        // Ensure data directory exists
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::open(&config.database_path)?;
        let store = AuthStore::with_bus(db.clone(), bus);

        let gateway: Arc<dyn CredentialApi> = Arc::new(CredentialGateway::with_timeout(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?);

        let session_manager = SessionManager::new(Arc::clone(&gateway), store);

        Ok(Self {
            config,
            db,
            gateway,
            session_manager,
        })
    }

    /// Restore the session from persistence. Returns immediately; when
    /// `validate_on_start` is set and a cached session was restored, a
    /// background probe is spawned onto the current tokio runtime.
    pub fn initialize(&self) -> Result<Session> {
        let session = self.session_manager.initialize()?;

        if self.config.validate_on_start && session.is_authenticated() {
            let manager = self.session_manager.clone();
            tokio::spawn(async move {
                manager.validate_cached_session().await;
            });
        }

        tracing::info!(phase = %session.phase, "Portal initialized");

        Ok(session)
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }

    /// Route-guard decision for the current session snapshot.
    pub fn route_decision(&self, requested_path: Option<&str>) -> GuardDecision {
        evaluate_route(&self.session_manager.snapshot(), requested_path)
    }

    // === User configuration pass-through ===

    pub async fn user_config(&self) -> Result<UserConfig> {
        Ok(self.gateway.user_config(&self.bearer_token()?).await?)
    }

    pub async fn create_user_config(&self, config: &UserConfig) -> Result<UserConfig> {
        Ok(self
            .gateway
            .create_user_config(&self.bearer_token()?, config)
            .await?)
    }

    pub async fn update_user_config(&self, config: &UserConfig) -> Result<UserConfig> {
        Ok(self
            .gateway
            .update_user_config(&self.bearer_token()?, config)
            .await?)
    }

    // === Config ===

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn bearer_token(&self) -> Result<String> {
        self.session_manager
            .snapshot()
            .token
            .ok_or(CoreError::NotAuthenticated)
    }
}

// Implement std::io::Error conversion for fs operations
impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}
