use async_trait::async_trait;
use techdesk_core::{AppResult, AuthFailure, Session, UserId};
use techdesk_domain::{Role, SignUpProfile};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Kind of auth-state change reported by the remote auth service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A session was created, here or elsewhere.
    SignedIn,
    /// The session ended, here or elsewhere.
    SignedOut,
    /// The same account received rotated tokens.
    TokenRefreshed,
}

impl SessionEvent {
    /// Returns a stable label for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignedIn => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed => "token_refreshed",
        }
    }
}

/// One auth-state change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    /// What happened.
    pub event: SessionEvent,
    /// The session that is current after the change, if any.
    pub session: Option<Session>,
}

impl SessionChange {
    /// Builds a notification for a newly established session.
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self {
            event: SessionEvent::SignedIn,
            session: Some(session),
        }
    }

    /// Builds a notification for an ended session.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            event: SessionEvent::SignedOut,
            session: None,
        }
    }

    /// Builds a notification for rotated tokens.
    #[must_use]
    pub fn token_refreshed(session: Session) -> Self {
        Self {
            event: SessionEvent::TokenRefreshed,
            session: Some(session),
        }
    }
}

/// Long-lived registration for auth-state change notifications.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    /// Wraps a broadcast receiver fed by an auth service adapter.
    #[must_use]
    pub fn new(receiver: broadcast::Receiver<SessionChange>) -> Self {
        Self { receiver }
    }

    /// Waits for the next change. Returns `None` once the sender side is gone.
    ///
    /// Lagging behind the sender only skips intermediate changes; every
    /// notification carries the full current session, so the next one
    /// received is still authoritative.
    pub async fn next(&mut self) -> Option<SessionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session change subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

/// Options forwarded with a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOptions {
    /// Where the confirmation link sends the user back to.
    pub redirect_to: Option<String>,
    /// Profile metadata stored with the new account.
    pub profile: SignUpProfile,
}

/// Port for the hosted authentication service.
#[async_trait]
pub trait RemoteAuthService: Send + Sync {
    /// Returns the session persisted from a previous run, if still usable.
    async fn restore_session(&self) -> AppResult<Option<Session>>;

    /// Registers for auth-state change notifications.
    async fn subscribe(&self) -> SessionSubscription;

    /// Exchanges credentials for a session.
    ///
    /// Implementations must also publish a [`SessionEvent::SignedIn`] change.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthFailure>;

    /// Registers a new account. Does not establish a session.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<(), AuthFailure>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), AuthFailure>;
}

/// Port for the table mapping accounts to roles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Looks up the role row for one account. A missing row is `Ok(None)`.
    async fn lookup_role(&self, user_id: UserId) -> AppResult<Option<Role>>;
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::{SessionChange, SessionEvent, SessionSubscription};

    #[tokio::test]
    async fn subscription_ends_when_sender_drops() {
        let (sender, receiver) = broadcast::channel(4);
        let mut subscription = SessionSubscription::new(receiver);

        let _ = sender.send(SessionChange::signed_out());
        drop(sender);

        assert_eq!(
            subscription.next().await.map(|change| change.event),
            Some(SessionEvent::SignedOut)
        );
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn lagged_subscription_resumes_with_latest_changes() {
        let (sender, receiver) = broadcast::channel(1);
        let mut subscription = SessionSubscription::new(receiver);

        let _ = sender.send(SessionChange::signed_out());
        let _ = sender.send(SessionChange::signed_out());
        let _ = sender.send(SessionChange::signed_out());

        assert!(subscription.next().await.is_some());
    }
}
