//! Session data structure and event reducer
//!
//! `Session` is the in-memory snapshot of the authentication state;
//! `SessionEvent` is the tagged union of everything that can happen to it.
//! `apply` is the single place state changes, validated against the
//! [`SessionPhase`] transition table. Events that would produce an invalid
//! transition are dropped, so out-of-order notifications (a storage event
//! landing mid-operation, a profile update racing a logout) degrade to
//! no-ops instead of corrupting state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vantage_gateway::{ProfileUpdate, User};

use crate::state::SessionPhase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub phase: SessionPhase,
    /// Present iff authenticated
    pub user: Option<User>,
    /// Present iff authenticated
    pub token: Option<String>,
    /// Last operation failure, cleared explicitly or when the next
    /// operation starts
    pub error: Option<String>,
    /// When this context became authenticated
    pub authenticated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// `initialize` began restoring from persistence
    InitializeStarted,
    /// Cached token and user were both found; no network involved
    RestoreSucceeded { user: User, token: String },
    /// Persistence held no usable session
    RestoreEmpty,
    /// A login or register call went out
    AuthStarted,
    AuthSucceeded { user: User, token: String },
    /// `transport` distinguishes a network-level failure (phase `Error`)
    /// from rejected credentials or payload (phase `Unauthenticated`)
    AuthFailed { message: String, transport: bool },
    LoggedOut,
    /// Partial profile fields applied by the backend
    UserUpdated { update: ProfileUpdate },
    /// Full user record re-fetched from the backend
    UserRefreshed { user: User },
    UserUpdateFailed { message: String },
    ErrorCleared,
    /// Another context removed the persisted token
    ExternalTokenRemoved,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// Apply an event, enforcing the phase transition table. Events whose
    /// target phase is unreachable from the current phase are ignored.
    pub fn apply(&mut self, event: SessionEvent) {
        // User mutations only make sense against an authenticated session;
        // without this check they would ride the Loading -> Authenticated
        // transition and fabricate a session out of nothing.
        if matches!(
            event,
            SessionEvent::UserUpdated { .. }
                | SessionEvent::UserRefreshed { .. }
                | SessionEvent::UserUpdateFailed { .. }
        ) && self.phase != SessionPhase::Authenticated
        {
            tracing::debug!(phase = %self.phase, "Ignoring user mutation without a session");
            return;
        }

        let target = self.target_phase(&event);
        if !self.phase.can_transition_to(target) {
            tracing::debug!(
                from = %self.phase,
                to = %target,
                event = ?event,
                "Ignoring event with invalid phase transition"
            );
            return;
        }

        match event {
            SessionEvent::InitializeStarted => {}
            SessionEvent::AuthStarted => {
                self.error = None;
            }
            SessionEvent::RestoreSucceeded { user, token }
            | SessionEvent::AuthSucceeded { user, token } => {
                self.user = Some(user);
                self.token = Some(token);
                self.error = None;
                self.authenticated_at = Some(Utc::now());
            }
            SessionEvent::RestoreEmpty => {
                self.user = None;
                self.token = None;
                self.authenticated_at = None;
            }
            SessionEvent::AuthFailed { message, .. } => {
                self.user = None;
                self.token = None;
                self.error = Some(message);
                self.authenticated_at = None;
            }
            SessionEvent::LoggedOut | SessionEvent::ExternalTokenRemoved => {
                self.user = None;
                self.token = None;
                self.error = None;
                self.authenticated_at = None;
            }
            SessionEvent::UserUpdated { update } => {
                if let Some(user) = self.user.as_mut() {
                    if let Some(nickname) = update.nickname {
                        user.nickname = Some(nickname);
                    }
                    if let Some(avatar) = update.avatar {
                        user.avatar = Some(avatar);
                    }
                    if let Some(email) = update.email {
                        user.email = email;
                    }
                }
            }
            SessionEvent::UserRefreshed { user } => {
                self.user = Some(user);
            }
            SessionEvent::UserUpdateFailed { message } => {
                self.error = Some(message);
            }
            SessionEvent::ErrorCleared => {
                self.error = None;
            }
        }

        self.phase = target;

        debug_assert_eq!(
            self.is_authenticated(),
            self.user.is_some() && self.token.is_some(),
            "user and token must be present exactly when authenticated"
        );
    }

    fn target_phase(&self, event: &SessionEvent) -> SessionPhase {
        match event {
            SessionEvent::InitializeStarted | SessionEvent::AuthStarted => SessionPhase::Loading,
            SessionEvent::RestoreSucceeded { .. } | SessionEvent::AuthSucceeded { .. } => {
                SessionPhase::Authenticated
            }
            SessionEvent::RestoreEmpty
            | SessionEvent::LoggedOut
            | SessionEvent::ExternalTokenRemoved => SessionPhase::Unauthenticated,
            SessionEvent::AuthFailed { transport, .. } => {
                if *transport {
                    SessionPhase::Error
                } else {
                    SessionPhase::Unauthenticated
                }
            }
            SessionEvent::UserUpdated { .. }
            | SessionEvent::UserRefreshed { .. }
            | SessionEvent::UserUpdateFailed { .. } => SessionPhase::Authenticated,
            SessionEvent::ErrorCleared => self.phase,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            user: None,
            token: None,
            error: None,
            authenticated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            nickname: None,
            avatar: None,
            permissions: ["dashboard:view".to_string()].into_iter().collect(),
        }
    }

    fn invariant_holds(session: &Session) -> bool {
        session.is_authenticated() == (session.user.is_some() && session.token.is_some())
    }

    #[test]
    fn test_restore_from_cache() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        assert!(session.is_loading());

        session.apply(SessionEvent::RestoreSucceeded {
            user: alice(),
            token: "t1".to_string(),
        });

        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert_eq!(session.token.as_deref(), Some("t1"));
        assert_eq!(session.user.as_ref().unwrap().username, "alice");
        assert!(invariant_holds(&session));
    }

    #[test]
    fn test_restore_empty() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreEmpty);

        assert_eq!(session.phase, SessionPhase::Unauthenticated);
        assert!(session.user.is_none());
        assert!(session.token.is_none());
        assert!(invariant_holds(&session));
    }

    #[test]
    fn test_rejected_credentials_stay_unauthenticated() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreEmpty);

        session.apply(SessionEvent::AuthStarted);
        session.apply(SessionEvent::AuthFailed {
            message: "Invalid username or password".to_string(),
            transport: false,
        });

        assert_eq!(session.phase, SessionPhase::Unauthenticated);
        assert_eq!(session.error.as_deref(), Some("Invalid username or password"));
        assert!(invariant_holds(&session));
    }

    #[test]
    fn test_transport_failure_enters_error_phase() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreEmpty);

        session.apply(SessionEvent::AuthStarted);
        session.apply(SessionEvent::AuthFailed {
            message: "Request timed out".to_string(),
            transport: true,
        });

        assert_eq!(session.phase, SessionPhase::Error);
        assert!(invariant_holds(&session));

        // A new attempt clears the error and re-enters Loading
        session.apply(SessionEvent::AuthStarted);
        assert_eq!(session.phase, SessionPhase::Loading);
        assert!(session.error.is_none());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreSucceeded {
            user: alice(),
            token: "t1".to_string(),
        });

        session.apply(SessionEvent::LoggedOut);
        let after_first = session.clone();

        session.apply(SessionEvent::LoggedOut);
        assert_eq!(session, after_first);
        assert_eq!(session.phase, SessionPhase::Unauthenticated);
        assert!(session.user.is_none() && session.token.is_none());
    }

    #[test]
    fn test_external_removal_from_any_phase() {
        let builders: [fn() -> Session; 3] = [
            Session::default,
            || {
                let mut s = Session::default();
                s.apply(SessionEvent::InitializeStarted);
                s
            },
            || {
                let mut s = Session::default();
                s.apply(SessionEvent::InitializeStarted);
                s.apply(SessionEvent::RestoreSucceeded {
                    user: alice(),
                    token: "t1".to_string(),
                });
                s
            },
        ];

        for build in builders {
            let mut session = build();
            session.apply(SessionEvent::ExternalTokenRemoved);
            assert_eq!(session.phase, SessionPhase::Unauthenticated);
            assert!(session.user.is_none() && session.token.is_none());
            assert!(invariant_holds(&session));
        }
    }

    #[test]
    fn test_user_update_merges_partial_fields() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreSucceeded {
            user: alice(),
            token: "t1".to_string(),
        });

        session.apply(SessionEvent::UserUpdated {
            update: ProfileUpdate {
                nickname: Some("Ally".to_string()),
                ..Default::default()
            },
        });

        let user = session.user.as_ref().unwrap();
        assert_eq!(user.nickname.as_deref(), Some("Ally"));
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(session.token.as_deref(), Some("t1"));
    }

    #[test]
    fn test_user_update_failure_keeps_session_authenticated() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreSucceeded {
            user: alice(),
            token: "t1".to_string(),
        });

        session.apply(SessionEvent::UserUpdateFailed {
            message: "Request timed out".to_string(),
        });

        assert!(session.is_authenticated());
        assert_eq!(session.error.as_deref(), Some("Request timed out"));
        assert_eq!(session.user.as_ref().unwrap().username, "alice");
        assert!(invariant_holds(&session));
    }

    #[test]
    fn test_user_update_without_session_is_ignored() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreEmpty);

        session.apply(SessionEvent::UserUpdated {
            update: ProfileUpdate {
                nickname: Some("ghost".to_string()),
                ..Default::default()
            },
        });

        assert_eq!(session.phase, SessionPhase::Unauthenticated);
        assert!(session.user.is_none());
    }

    #[test]
    fn test_clear_error_keeps_phase() {
        let mut session = Session::default();
        session.apply(SessionEvent::InitializeStarted);
        session.apply(SessionEvent::RestoreEmpty);
        session.apply(SessionEvent::AuthStarted);
        session.apply(SessionEvent::AuthFailed {
            message: "backend offline".to_string(),
            transport: true,
        });

        session.apply(SessionEvent::ErrorCleared);
        assert_eq!(session.phase, SessionPhase::Error);
        assert!(session.error.is_none());
    }
}
