use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::UserId;

/// Account information carried inside an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    id: UserId,
    email: String,
}

impl Identity {
    /// Creates an identity from the values issued by the auth service.
    #[must_use]
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }

    /// Returns the stable identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the account email.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}

/// Proof-of-authentication bundle issued by the remote auth service.
///
/// Tokens are opaque to this crate. The `Debug` output redacts them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    identity: Identity,
}

impl Session {
    /// Creates a session bundle.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
        identity: Identity,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
            identity,
        }
    }

    /// Returns the bearer token used for authenticated calls.
    #[must_use]
    pub fn access_token(&self) -> &str {
        self.access_token.as_str()
    }

    /// Returns the token used to mint a new session once this one expires.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.as_str()
    }

    /// Returns the instant after which the access token is rejected.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the identity the session was issued for.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Returns whether the access token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Returns whether both sessions belong to the same account.
    #[must_use]
    pub fn same_identity(&self, other: &Session) -> bool {
        self.identity.id() == other.identity.id()
    }
}

impl Debug for Session {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Reasons a sign-in or sign-up attempt was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// The auth service rejected the email/password pair.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The auth service could not be reached or did not answer in time.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The auth service answered with an error message.
    #[error("{0}")]
    ServiceError(String),

    /// Input was rejected locally before contacting the auth service.
    #[error("{0}")]
    InvalidInput(String),
}

impl AuthFailure {
    /// Returns the short message suitable for display next to a form.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}
