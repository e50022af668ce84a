//! Route guard evaluation
//!
//! Pure decision over a session snapshot for a host router: render the
//! protected content, show a loading indicator, or redirect to the login
//! route. The originally requested path rides along so the router can
//! return the user there after a successful login.

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the protected content
    Allow,
    /// Session outcome unresolved; render a loading indicator
    Pending,
    /// Send the user to the login route
    RedirectToLogin {
        /// Path to return to after login
        return_to: Option<String>,
    },
}

pub fn evaluate_route(session: &Session, requested_path: Option<&str>) -> GuardDecision {
    if session.is_loading() {
        return GuardDecision::Pending;
    }

    if session.is_authenticated() {
        return GuardDecision::Allow;
    }

    GuardDecision::RedirectToLogin {
        return_to: requested_path.map(str::to_owned),
    }
}
