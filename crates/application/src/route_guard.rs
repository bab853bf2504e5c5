//! Screen gating derived from an [`AuthoritySnapshot`].
//!
//! This only keeps obviously wrong screens from rendering. Data access is
//! enforced by the hosted backend's row-level policies.

use techdesk_domain::Role;

use crate::AuthoritySnapshot;

/// Entry point for signing in.
pub const SIGN_IN_PATH: &str = "/auth";

/// Public entry point used after an authorization failure.
pub const PUBLIC_ENTRY_PATH: &str = "/";

/// Outcome of evaluating a guarded screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Resolution is in flight; render a placeholder and do not redirect.
    Pending,
    /// Render the screen.
    Allow,
    /// Nobody is signed in.
    RedirectToSignIn,
    /// Signed in with a different role than the screen requires.
    Forbidden {
        /// Role the screen requires.
        required: Role,
        /// Role of the signed-in account.
        actual: Role,
    },
}

impl GuardDecision {
    /// Returns where the consumer should navigate, if anywhere.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Self::Pending | Self::Allow => None,
            Self::RedirectToSignIn => Some(SIGN_IN_PATH),
            Self::Forbidden { .. } => Some(PUBLIC_ENTRY_PATH),
        }
    }
}

/// Evaluates whether a screen requiring `required_role` may render.
#[must_use]
pub fn evaluate(snapshot: &AuthoritySnapshot, required_role: Option<Role>) -> GuardDecision {
    if snapshot.loading() {
        return GuardDecision::Pending;
    }

    if snapshot.user().is_none() {
        return GuardDecision::RedirectToSignIn;
    }

    let actual = snapshot.role().unwrap_or_default();
    match required_role {
        Some(required) if required != actual => GuardDecision::Forbidden { required, actual },
        _ => GuardDecision::Allow,
    }
}

/// Returns the dashboard the signed-in account lands on, once settled.
#[must_use]
pub fn landing_path(snapshot: &AuthoritySnapshot) -> Option<&'static str> {
    match evaluate(snapshot, None) {
        GuardDecision::Allow => snapshot.role().map(|role| role.dashboard_path()),
        _ => None,
    }
}
