//! Session Manager
//!
//! Drives the session reducer from gateway and storage outcomes. One
//! instance is shared per application; clones share state.
//!
//! Overlapping auth operations are a caller error: `is_loading` on the
//! snapshot is the only in-flight signal, and the manager does not
//! serialize concurrent `login`/`register`/`logout` calls. Behavior under
//! them is unspecified.

use parking_lot::RwLock;
use std::sync::Arc;

use vantage_gateway::{
    AuthPayload, CredentialApi, Credentials, GatewayError, ProfileUpdate, RegisterRequest,
};
use vantage_storage::{AuthStore, ChangeKind, Watcher, TOKEN_KEY};

use crate::session::{Session, SessionEvent};
use crate::Result;

pub struct SessionManager {
    state: Arc<RwLock<Session>>,
    gateway: Arc<dyn CredentialApi>,
    store: AuthStore,
    /// Keeps the cross-context subscription alive for the manager's
    /// lifetime; dropping the last clone unsubscribes.
    _watcher: Arc<Watcher>,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn CredentialApi>, store: AuthStore) -> Self {
        let state = Arc::new(RwLock::new(Session::default()));

        // Token removal by another context forces a logout here, whatever
        // this context is doing at the time.
        let listener_state = Arc::clone(&state);
        let watcher = store.on_external_change(move |change| {
            if change.key == TOKEN_KEY && change.kind == ChangeKind::Removed {
                tracing::info!("Token removed by another context, ending session");
                listener_state
                    .write()
                    .apply(SessionEvent::ExternalTokenRemoved);
            }
        });

        Self {
            state,
            gateway,
            store,
            _watcher: Arc::new(watcher),
        }
    }

    /// Restore the session from persistence. Trusts cached credentials
    /// without revalidating them remotely; a stale token surfaces as an
    /// authorization failure on the first authenticated call and is
    /// remediated through [`SessionManager::invalidate_session`]. Never
    /// performs network I/O, so startup never waits on the backend.
    pub fn initialize(&self) -> Result<Session> {
        self.state.write().apply(SessionEvent::InitializeStarted);

        let token = self.store.token()?;
        let user = self.store.current_user()?;

        let mut state = self.state.write();
        match (token, user) {
            (Some(token), Some(user)) => {
                state.apply(SessionEvent::RestoreSucceeded { user, token });
                tracing::info!("Restored cached session");
            }
            _ => {
                state.apply(SessionEvent::RestoreEmpty);
                tracing::info!("No cached session found");
            }
        }

        Ok(state.clone())
    }

    /// Authenticate with username and password. On failure the error is
    /// recorded in the session and returned, so the invoking form can keep
    /// itself open and show the message.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        self.state.write().apply(SessionEvent::AuthStarted);

        match self.gateway.login(credentials).await {
            Ok(payload) => self.complete_auth(payload, "login"),
            Err(e) => Err(self.fail_auth(e, "login")),
        }
    }

    /// Create an account and authenticate in one step. Success and failure
    /// handling are identical to [`SessionManager::login`].
    pub async fn register(&self, request: &RegisterRequest) -> Result<Session> {
        self.state.write().apply(SessionEvent::AuthStarted);

        match self.gateway.register(request).await {
            Ok(payload) => self.complete_auth(payload, "register"),
            Err(e) => Err(self.fail_auth(e, "register")),
        }
    }

    /// Authenticate with a third-party Google OAuth access token.
    pub async fn login_with_google(&self, access_token: &str) -> Result<Session> {
        self.state.write().apply(SessionEvent::AuthStarted);

        match self.gateway.login_with_google(access_token).await {
            Ok(payload) => self.complete_auth(payload, "google"),
            Err(e) => Err(self.fail_auth(e, "google")),
        }
    }

    /// End the session. The network call is best-effort; local state and
    /// persistence are cleared unconditionally, so a dead backend can never
    /// leave the UI looking signed in. Idempotent.
    pub async fn logout(&self) -> Session {
        let token = self.state.read().token.clone();
        if let Some(token) = token {
            if let Err(e) = self.gateway.logout(&token).await {
                tracing::warn!(error = %e, "Logout call failed, clearing locally anyway");
            }
        }

        if let Err(e) = self.store.clear_auth_data() {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }

        let mut state = self.state.write();
        state.apply(SessionEvent::LoggedOut);
        tracing::info!("Session ended");

        state.clone()
    }

    /// Apply a partial profile update. The gateway is called first; only
    /// the fields it confirms are merged into the user, and the token is
    /// untouched. Failures are recorded in `error` without ending the
    /// session, except an authorization failure, which invalidates it.
    pub async fn update_user(&self, update: &ProfileUpdate) -> Session {
        let Some(token) = self.state.read().token.clone() else {
            return self.snapshot();
        };

        match self.gateway.update_profile(&token, update).await {
            Ok(applied) => {
                self.state
                    .write()
                    .apply(SessionEvent::UserUpdated { update: applied });
                self.persist_current_user();
            }
            Err(e) if e.is_unauthorized() => {
                self.invalidate_session();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile update failed");
                self.state.write().apply(SessionEvent::UserUpdateFailed {
                    message: e.to_string(),
                });
            }
        }

        self.snapshot()
    }

    /// Re-fetch the user record from the backend. Doubles as a
    /// token-validity probe: an authorization failure invalidates the
    /// cached session.
    pub async fn refresh_user(&self) -> Session {
        let Some(token) = self.state.read().token.clone() else {
            return self.snapshot();
        };

        match self.gateway.current_user(&token).await {
            Ok(user) => {
                self.state.write().apply(SessionEvent::UserRefreshed { user });
                self.persist_current_user();
            }
            Err(e) if e.is_unauthorized() => {
                self.invalidate_session();
            }
            Err(e) => {
                tracing::warn!(error = %e, "User refresh failed");
                self.state.write().apply(SessionEvent::UserUpdateFailed {
                    message: e.to_string(),
                });
            }
        }

        self.snapshot()
    }

    /// Probe a cache-restored session in the background. Only a definitive
    /// authorization failure ends the session; an unreachable backend
    /// keeps the optimistic restore (availability over freshness).
    pub async fn validate_cached_session(&self) {
        let Some(token) = self.state.read().token.clone() else {
            return;
        };

        match self.gateway.current_user(&token).await {
            Ok(user) => {
                self.state.write().apply(SessionEvent::UserRefreshed { user });
                self.persist_current_user();
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Cached session rejected by backend");
                self.invalidate_session();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Background validation inconclusive");
            }
        }
    }

    /// Forced local logout for a session the backend no longer accepts.
    /// Called internally on authorization failures and available to any
    /// caller whose authenticated request came back rejected.
    pub fn invalidate_session(&self) {
        if let Err(e) = self.store.clear_auth_data() {
            tracing::warn!(error = %e, "Failed to clear persisted session");
        }

        let mut state = self.state.write();
        state.apply(SessionEvent::LoggedOut);
        tracing::info!("Stale session invalidated");
    }

    /// True iff the current user holds the named permission. A missing
    /// user or empty permission set is `false`, never an error.
    pub fn has_permission(&self, name: &str) -> bool {
        self.state
            .read()
            .user
            .as_ref()
            .is_some_and(|user| user.has_permission(name))
    }

    pub fn clear_error(&self) {
        self.state.write().apply(SessionEvent::ErrorCleared);
    }

    pub fn snapshot(&self) -> Session {
        self.state.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().is_loading()
    }

    fn complete_auth(&self, payload: AuthPayload, operation: &'static str) -> Result<Session> {
        let Some(token) = payload.bearer_token().map(str::to_owned) else {
            let error =
                GatewayError::Transport("Response is missing the access token".to_string());
            return Err(self.fail_auth(error, operation));
        };

        // Persist before flipping state, so a reader that sees an
        // authenticated snapshot can rely on the store being populated.
        if let Err(e) = self.store.set_auth_data(&token, &payload.user) {
            self.state.write().apply(SessionEvent::AuthFailed {
                message: "Failed to persist session".to_string(),
                transport: true,
            });
            return Err(e.into());
        }

        let mut state = self.state.write();
        state.apply(SessionEvent::AuthSucceeded {
            user: payload.user,
            token,
        });

        tracing::info!(
            username = %state.user.as_ref().map(|u| u.username.as_str()).unwrap_or_default(),
            operation,
            "Authenticated"
        );

        Ok(state.clone())
    }

    fn fail_auth(&self, error: GatewayError, operation: &'static str) -> crate::SessionError {
        tracing::warn!(error = %error, operation, "Authentication failed");

        self.state.write().apply(SessionEvent::AuthFailed {
            message: error.to_string(),
            transport: error.is_transport(),
        });

        error.into()
    }

    /// Write the in-memory user back next to the unchanged token.
    fn persist_current_user(&self) {
        let (user, token) = {
            let state = self.state.read();
            (state.user.clone(), state.token.clone())
        };

        if let (Some(user), Some(token)) = (user, token) {
            if let Err(e) = self.store.set_auth_data(&token, &user) {
                tracing::warn!(error = %e, "Failed to persist updated user");
            }
        }
    }
}

impl Clone for SessionManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            gateway: Arc::clone(&self.gateway),
            store: self.store.clone(),
            _watcher: Arc::clone(&self._watcher),
        }
    }
}
