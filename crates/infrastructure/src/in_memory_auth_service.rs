use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use techdesk_application::{RemoteAuthService, SessionChange, SessionSubscription, SignUpOptions};
use techdesk_core::{AppError, AppResult, AuthFailure, Identity, Session, UserId};
use techdesk_domain::{EmailAddress, SignUpProfile};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

const CHANGE_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    password: String,
    confirmed: bool,
    profile: Option<SignUpProfile>,
}

/// In-memory auth service for local development and tests.
///
/// Passwords are compared in plain text. Never point this at real accounts.
pub struct InMemoryAuthService {
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<Session>>,
    changes: broadcast::Sender<SessionChange>,
    auto_confirm: bool,
    session_ttl: chrono::Duration,
    unavailable: AtomicBool,
}

impl InMemoryAuthService {
    /// Creates an empty service. New sign-ups require confirmation.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            accounts: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            changes,
            auto_confirm: false,
            session_ttl: chrono::Duration::hours(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Confirms new sign-ups immediately.
    #[must_use]
    pub fn with_auto_confirm(mut self, auto_confirm: bool) -> Self {
        self.auto_confirm = auto_confirm;
        self
    }

    /// Adds a confirmed account and returns its identity.
    pub async fn seed_account(&self, email: &str, password: &str) -> AppResult<Identity> {
        let email = EmailAddress::new(email)?;
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email.as_str()) {
            return Err(AppError::Conflict(format!(
                "account '{}' already exists",
                email.as_str()
            )));
        }

        let user_id = UserId::new();
        accounts.insert(
            email.as_str().to_owned(),
            Account {
                user_id,
                password: password.to_owned(),
                confirmed: true,
                profile: None,
            },
        );
        Ok(Identity::new(user_id, email.as_str()))
    }

    /// Marks a pending sign-up as confirmed.
    pub async fn confirm_email(&self, email: &str) -> AppResult<()> {
        let email = EmailAddress::new(email)?;
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(email.as_str())
            .ok_or_else(|| AppError::NotFound(format!("account '{}' not found", email.as_str())))?;
        account.confirmed = true;
        Ok(())
    }

    /// Returns the identifier registered for `email`.
    pub async fn find_user_id(&self, email: &str) -> Option<UserId> {
        let email = EmailAddress::new(email).ok()?;
        self.accounts
            .read()
            .await
            .get(email.as_str())
            .map(|account| account.user_id)
    }

    /// Returns the profile stored at sign-up for `email`.
    pub async fn find_profile(&self, email: &str) -> Option<SignUpProfile> {
        let email = EmailAddress::new(email).ok()?;
        self.accounts
            .read()
            .await
            .get(email.as_str())
            .and_then(|account| account.profile.clone())
    }

    /// Ends the current session as if it was revoked elsewhere.
    pub async fn revoke_session(&self) {
        if self.current.write().await.take().is_some() {
            self.notify(SessionChange::signed_out());
        }
    }

    /// Makes every remote call fail as if the service was unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AuthFailure> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthFailure::NetworkError(
                "auth service unavailable".to_owned(),
            ));
        }
        Ok(())
    }

    fn issue_session(&self, user_id: UserId, email: &str) -> Session {
        Session::new(
            uuid::Uuid::new_v4().to_string(),
            uuid::Uuid::new_v4().to_string(),
            Utc::now() + self.session_ttl,
            Identity::new(user_id, email),
        )
    }

    fn notify(&self, change: SessionChange) {
        if self.changes.send(change).is_err() {
            debug!("no session change subscribers");
        }
    }
}

impl Default for InMemoryAuthService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteAuthService for InMemoryAuthService {
    async fn restore_session(&self) -> AppResult<Option<Session>> {
        self.check_available()
            .map_err(|failure| AppError::Internal(failure.to_string()))?;
        Ok(self.current.read().await.clone())
    }

    async fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthFailure> {
        self.check_available()?;
        let email = EmailAddress::new(email).map_err(|_| AuthFailure::InvalidCredentials)?;
        let account = self.accounts.read().await.get(email.as_str()).cloned();

        let Some(account) = account.filter(|account| account.password == password) else {
            return Err(AuthFailure::InvalidCredentials);
        };
        if !account.confirmed {
            return Err(AuthFailure::ServiceError("Email not confirmed".to_owned()));
        }

        let session = self.issue_session(account.user_id, email.as_str());
        *self.current.write().await = Some(session.clone());
        self.notify(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<(), AuthFailure> {
        self.check_available()?;
        let email =
            EmailAddress::new(email).map_err(|error| AuthFailure::InvalidInput(error.to_string()))?;
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email.as_str()) {
            return Err(AuthFailure::ServiceError(
                "User already registered".to_owned(),
            ));
        }

        accounts.insert(
            email.as_str().to_owned(),
            Account {
                user_id: UserId::new(),
                password: password.to_owned(),
                confirmed: self.auto_confirm,
                profile: Some(options.profile),
            },
        );
        debug!(
            email = email.as_str(),
            redirect_to = options.redirect_to.as_deref().unwrap_or("<none>"),
            "registered account"
        );
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthFailure> {
        self.check_available()?;
        self.current.write().await.take();
        self.notify(SessionChange::signed_out());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use techdesk_application::{RemoteAuthService, SessionEvent, SignUpOptions};
    use techdesk_core::AuthFailure;
    use techdesk_domain::SignUpProfile;

    use super::InMemoryAuthService;

    fn options(display_name: &str) -> SignUpOptions {
        SignUpOptions {
            redirect_to: None,
            profile: SignUpProfile::new(display_name, None)
                .unwrap_or_else(|error| panic!("{error}")),
        }
    }

    #[tokio::test]
    async fn seeded_account_signs_in_case_insensitively() {
        let service = InMemoryAuthService::new();
        let identity = service
            .seed_account("Admin@TechDesk.test", "hunter22")
            .await
            .unwrap_or_else(|error| panic!("{error}"));
        let mut subscription = service.subscribe().await;

        let session = service
            .sign_in_with_password("admin@techdesk.test", "hunter22")
            .await
            .unwrap_or_else(|error| panic!("{error}"));

        assert_eq!(session.identity(), &identity);
        assert_eq!(
            subscription.next().await.map(|change| change.event),
            Some(SessionEvent::SignedIn)
        );
        assert_eq!(service.restore_session().await.ok().flatten(), Some(session));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_account_look_the_same() {
        let service = InMemoryAuthService::new();
        assert!(service.seed_account("a@techdesk.test", "hunter22").await.is_ok());

        assert_eq!(
            service.sign_in_with_password("a@techdesk.test", "nope").await,
            Err(AuthFailure::InvalidCredentials)
        );
        assert_eq!(
            service
                .sign_in_with_password("ghost@techdesk.test", "hunter22")
                .await,
            Err(AuthFailure::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn sign_up_requires_confirmation_by_default() {
        let service = InMemoryAuthService::new();
        assert_eq!(
            service
                .sign_up("new@techdesk.test", "hunter22", options("New"))
                .await,
            Ok(())
        );
        assert!(service.restore_session().await.ok().flatten().is_none());

        assert_eq!(
            service
                .sign_in_with_password("new@techdesk.test", "hunter22")
                .await,
            Err(AuthFailure::ServiceError("Email not confirmed".to_owned()))
        );

        assert!(service.confirm_email("new@techdesk.test").await.is_ok());
        assert!(
            service
                .sign_in_with_password("new@techdesk.test", "hunter22")
                .await
                .is_ok()
        );
        assert_eq!(
            service
                .find_profile("new@techdesk.test")
                .await
                .map(|profile| profile.display_name().to_owned()),
            Some("New".to_owned())
        );
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let service = InMemoryAuthService::new().with_auto_confirm(true);
        assert!(
            service
                .sign_up("dup@techdesk.test", "hunter22", options("Dup"))
                .await
                .is_ok()
        );

        assert_eq!(
            service
                .sign_up("dup@techdesk.test", "hunter22", options("Dup"))
                .await,
            Err(AuthFailure::ServiceError("User already registered".to_owned()))
        );
    }

    #[tokio::test]
    async fn unavailable_service_reports_network_errors() {
        let service = InMemoryAuthService::new();
        assert!(service.seed_account("a@techdesk.test", "hunter22").await.is_ok());
        service.set_unavailable(true);

        assert!(matches!(
            service.sign_in_with_password("a@techdesk.test", "hunter22").await,
            Err(AuthFailure::NetworkError(_))
        ));
        assert!(service.restore_session().await.is_err());
        assert!(matches!(
            service.sign_out().await,
            Err(AuthFailure::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn revoked_session_notifies_subscribers() {
        let service = InMemoryAuthService::new();
        assert!(service.seed_account("a@techdesk.test", "hunter22").await.is_ok());
        assert!(
            service
                .sign_in_with_password("a@techdesk.test", "hunter22")
                .await
                .is_ok()
        );
        let mut subscription = service.subscribe().await;

        service.revoke_session().await;

        assert_eq!(
            subscription.next().await.map(|change| change.event),
            Some(SessionEvent::SignedOut)
        );
        assert!(service.restore_session().await.ok().flatten().is_none());
    }
}
