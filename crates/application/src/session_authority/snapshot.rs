use techdesk_core::{Identity, Session};
use techdesk_domain::Role;

/// Named lifecycle states of the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityState {
    /// Startup has not resolved yet.
    Uninitialized,
    /// No session.
    Unauthenticated,
    /// A session is known and its role lookup is in flight.
    ResolvingRole,
    /// A session and its role are known.
    Authenticated,
}

impl AuthorityState {
    /// Returns a stable label for logs and transport.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Unauthenticated => "unauthenticated",
            Self::ResolvingRole => "resolving_role",
            Self::Authenticated => "authenticated",
        }
    }
}

/// Consistent view of who is signed in and with which role.
///
/// The user is always read from the session, so the two are present or
/// absent together. Values can only be built through the per-state
/// constructors, which keep `role` absent whenever `loading` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoritySnapshot {
    session: Option<Session>,
    role: Option<Role>,
    loading: bool,
}

impl AuthoritySnapshot {
    pub(crate) fn uninitialized() -> Self {
        Self {
            session: None,
            role: None,
            loading: true,
        }
    }

    pub(crate) fn unauthenticated() -> Self {
        Self {
            session: None,
            role: None,
            loading: false,
        }
    }

    pub(crate) fn resolving(session: Session) -> Self {
        Self {
            session: Some(session),
            role: None,
            loading: true,
        }
    }

    pub(crate) fn authenticated(session: Session, role: Role) -> Self {
        Self {
            session: Some(session),
            role: Some(role),
            loading: false,
        }
    }

    /// Same state with the session replaced by rotated tokens for the same account.
    pub(crate) fn with_session(&self, session: Session) -> Self {
        Self {
            session: Some(session),
            role: self.role,
            loading: self.loading,
        }
    }

    /// Completes an in-flight role lookup. Returns `None` when not resolving.
    pub(crate) fn resolved(&self, role: Role) -> Option<Self> {
        match (&self.session, self.state()) {
            (Some(session), AuthorityState::ResolvingRole) => {
                Some(Self::authenticated(session.clone(), role))
            }
            _ => None,
        }
    }

    /// Returns the signed-in identity.
    #[must_use]
    pub fn user(&self) -> Option<&Identity> {
        self.session.as_ref().map(Session::identity)
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns the resolved role.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// Returns whether a resolution is in flight.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Returns the named lifecycle state.
    #[must_use]
    pub fn state(&self) -> AuthorityState {
        match (self.session.is_some(), self.loading) {
            (false, true) => AuthorityState::Uninitialized,
            (false, false) => AuthorityState::Unauthenticated,
            (true, true) => AuthorityState::ResolvingRole,
            (true, false) => AuthorityState::Authenticated,
        }
    }

    /// Returns whether the snapshot satisfies every lifecycle invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let role_absent_while_loading = !self.loading || self.role.is_none();
        let role_present_when_settled =
            self.loading || self.session.is_none() || self.role.is_some();
        let no_role_without_user = self.session.is_some() || self.role.is_none();

        role_absent_while_loading && role_present_when_settled && no_role_without_user
    }
}

impl Default for AuthoritySnapshot {
    fn default() -> Self {
        Self::uninitialized()
    }
}
