//! Session Phase State Machine
//!
//! ```text
//! Uninitialized
//!   ↓ initialize
//! Loading
//!   ↓ cached credentials found        ↓ no cache / rejected    ↓ transport failure
//! Authenticated                       Unauthenticated          Error
//! ```
//!
//! Authenticated drops to Unauthenticated on logout, on external token
//! removal, or when a cached token turns out to be stale. Unauthenticated
//! and Error re-enter Loading when a new login or register attempt starts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Session exists but `initialize` has not run yet
    Uninitialized,
    /// An auth operation (initialize/login/register) is in flight
    Loading,
    /// User and token are both present
    Authenticated,
    /// No credentials; also the terminal logout state
    Unauthenticated,
    /// The last operation failed at the transport level
    Error,
}

impl SessionPhase {
    /// Check if transition to another phase is valid
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        match (self, target) {
            // Initialize begins a restore
            (SessionPhase::Uninitialized, SessionPhase::Loading) => true,
            // A restore or auth attempt resolves one of three ways
            (SessionPhase::Loading, SessionPhase::Authenticated) => true,
            (SessionPhase::Loading, SessionPhase::Unauthenticated) => true,
            (SessionPhase::Loading, SessionPhase::Error) => true,
            // A new login/register attempt from a signed-out session
            (SessionPhase::Unauthenticated, SessionPhase::Loading) => true,
            (SessionPhase::Error, SessionPhase::Loading) => true,
            // Logout, external token removal, stale session
            (SessionPhase::Authenticated, SessionPhase::Unauthenticated) => true,
            (SessionPhase::Error, SessionPhase::Unauthenticated) => true,
            (SessionPhase::Uninitialized, SessionPhase::Unauthenticated) => true,
            // Same phase is always valid (no-op)
            (a, b) if *a == b => true,
            // All other transitions are invalid
            _ => false,
        }
    }

    /// True while the session outcome is still unresolved; route guards
    /// render a loading indicator instead of deciding.
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionPhase::Uninitialized | SessionPhase::Loading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Loading => "loading",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::Error => "error",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uninitialized" => Ok(SessionPhase::Uninitialized),
            "loading" => Ok(SessionPhase::Loading),
            "authenticated" => Ok(SessionPhase::Authenticated),
            "unauthenticated" => Ok(SessionPhase::Unauthenticated),
            "error" => Ok(SessionPhase::Error),
            _ => Err(format!("Unknown session phase: {}", s)),
        }
    }
}
