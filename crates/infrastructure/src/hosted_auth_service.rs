use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use techdesk_application::{RemoteAuthService, SessionChange, SessionSubscription, SignUpOptions};
use techdesk_core::{AppError, AppResult, AuthFailure, Session};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{FileSessionStore, HostedBackend};

mod wire;

use wire::{
    PasswordGrantRequest, RefreshGrantRequest, SignUpMetadata, SignUpRequestBody, TokenResponse,
    auth_failure_from_response,
};

const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Current session plus a counter bumped on every replacement.
///
/// Work that awaits the network captures the epoch first and only commits
/// if nothing replaced the session in the meantime.
#[derive(Debug, Default)]
struct SessionSlot {
    session: Option<Session>,
    epoch: u64,
}

/// Remote auth adapter for a GoTrue-compatible hosted auth API.
///
/// Holds the current session in memory, mirrors it to an optional
/// [`FileSessionStore`], and broadcasts every change to subscribers.
pub struct HostedAuthService {
    backend: HostedBackend,
    session_store: Option<FileSessionStore>,
    current: RwLock<SessionSlot>,
    changes: broadcast::Sender<SessionChange>,
    refresh_margin: chrono::Duration,
}

impl HostedAuthService {
    /// Creates an adapter. Sessions are persisted only when a store is given.
    #[must_use]
    pub fn new(backend: HostedBackend, session_store: Option<FileSessionStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            backend,
            session_store,
            current: RwLock::new(SessionSlot::default()),
            changes,
            refresh_margin: chrono::Duration::seconds(60),
        }
    }

    /// Overrides how long before expiry a session is refreshed.
    #[must_use]
    pub fn with_refresh_margin(mut self, margin: chrono::Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Returns the bearer token of the current session.
    pub async fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .session
            .as_ref()
            .map(|session| session.access_token().to_owned())
    }

    /// Exchanges the current refresh token for a new session.
    ///
    /// A rejected refresh ends the session and broadcasts a sign-out.
    /// Transport failures leave the session untouched. If the session is
    /// replaced while the request is in flight (sign-out, another sign-in),
    /// the response is dropped and the replacement is returned.
    pub async fn refresh_session(&self) -> AppResult<Option<Session>> {
        let (current, epoch) = {
            let slot = self.current.read().await;
            match &slot.session {
                Some(session) => (session.clone(), slot.epoch),
                None => return Ok(None),
            }
        };

        match self.request_refresh(current.refresh_token()).await {
            Ok(session) => {
                if !session.same_identity(&current) {
                    warn!(
                        previous = %current.identity().id(),
                        next = %session.identity().id(),
                        "refresh returned a different account"
                    );
                }
                if !self.commit_session(epoch, Some(session.clone())).await {
                    return Ok(self.superseded("refreshed session").await);
                }
                self.notify(SessionChange::token_refreshed(session.clone()));
                debug!(user_id = %session.identity().id(), "session refreshed");
                Ok(Some(session))
            }
            Err(AuthFailure::NetworkError(message)) => Err(AppError::Internal(format!(
                "session refresh failed: {message}"
            ))),
            Err(failure) => {
                if !self.commit_session(epoch, None).await {
                    return Ok(self.superseded("refresh rejection").await);
                }
                info!(reason = %failure, "session refresh rejected; signing out");
                self.notify(SessionChange::signed_out());
                Ok(None)
            }
        }
    }

    /// Spawns a task that refreshes the session shortly before it expires.
    ///
    /// The task stops once the adapter is dropped.
    pub fn spawn_auto_refresh(self: &Arc<Self>, check_interval: Duration) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        tokio::spawn(run_auto_refresh(service, check_interval))
    }

    async fn due_for_refresh(&self) -> bool {
        let deadline = Utc::now() + self.refresh_margin;
        self.current
            .read()
            .await
            .session
            .as_ref()
            .is_some_and(|session| session.is_expired_at(deadline))
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<Session, AuthFailure> {
        let url = self
            .backend
            .endpoint("auth/v1/token", &[("grant_type", "refresh_token")])
            .map_err(service_error)?;
        let response = self
            .post_json(url, None, &RefreshGrantRequest { refresh_token })
            .await?;
        read_session(response).await
    }

    async fn request_logout(&self, access_token: &str) -> Result<(), AuthFailure> {
        let url = self
            .backend
            .endpoint("auth/v1/logout", &[])
            .map_err(service_error)?;
        let response = self
            .post_json(url, Some(access_token), &serde_json::json!({}))
            .await?;

        let status = response.status();
        // An already-revoked token still means the session is gone.
        if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(auth_failure_from_response(status.as_u16(), &text))
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: url::Url,
        bearer: Option<&str>,
        body: &T,
    ) -> Result<reqwest::Response, AuthFailure> {
        self.backend
            .client()
            .post(url)
            .header("apikey", self.backend.anon_key())
            .bearer_auth(bearer.unwrap_or(self.backend.anon_key()))
            .json(body)
            .send()
            .await
            .map_err(|error| AuthFailure::NetworkError(format!("auth request failed: {error}")))
    }

    /// Replaces the session unconditionally.
    async fn store_session(&self, session: Option<Session>) {
        let mut slot = self.current.write().await;
        self.persist(session.as_ref()).await;
        slot.session = session;
        slot.epoch += 1;
    }

    /// Replaces the session only if it is still at `epoch`.
    async fn commit_session(&self, epoch: u64, session: Option<Session>) -> bool {
        let mut slot = self.current.write().await;
        if slot.epoch != epoch {
            return false;
        }

        self.persist(session.as_ref()).await;
        slot.session = session;
        slot.epoch += 1;
        true
    }

    async fn superseded(&self, what: &str) -> Option<Session> {
        debug!(what, "session replaced while request was in flight; dropping result");
        self.current.read().await.session.clone()
    }

    async fn persist(&self, session: Option<&Session>) {
        let Some(store) = &self.session_store else {
            return;
        };

        let persisted = match session {
            Some(session) => store.save(session).await,
            None => store.clear().await,
        };
        if let Err(error) = persisted {
            warn!(error = %error, "failed to persist session");
        }
    }

    fn notify(&self, change: SessionChange) {
        if self.changes.send(change).is_err() {
            debug!("no session change subscribers");
        }
    }
}

#[async_trait]
impl RemoteAuthService for HostedAuthService {
    async fn restore_session(&self) -> AppResult<Option<Session>> {
        let epoch = {
            let slot = self.current.read().await;
            if let Some(session) = &slot.session {
                return Ok(Some(session.clone()));
            }
            slot.epoch
        };

        let Some(store) = &self.session_store else {
            return Ok(None);
        };
        let Some(stored) = store.load().await? else {
            return Ok(None);
        };

        if !stored.is_expired_at(Utc::now() + self.refresh_margin) {
            let mut slot = self.current.write().await;
            if slot.epoch != epoch {
                return Ok(slot.session.clone());
            }
            slot.session = Some(stored.clone());
            slot.epoch += 1;
            return Ok(Some(stored));
        }

        match self.request_refresh(stored.refresh_token()).await {
            Ok(session) => {
                if !self.commit_session(epoch, Some(session.clone())).await {
                    return Ok(self.superseded("restored session").await);
                }
                info!(user_id = %session.identity().id(), "restored session after refresh");
                Ok(Some(session))
            }
            Err(AuthFailure::NetworkError(message)) => Err(AppError::Internal(format!(
                "failed to refresh stored session: {message}"
            ))),
            Err(failure) => {
                if !self.commit_session(epoch, None).await {
                    return Ok(self.superseded("stored session rejection").await);
                }
                info!(reason = %failure, "stored session is no longer valid");
                Ok(None)
            }
        }
    }

    async fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.changes.subscribe())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthFailure> {
        let url = self
            .backend
            .endpoint("auth/v1/token", &[("grant_type", "password")])
            .map_err(service_error)?;
        let response = self
            .post_json(url, None, &PasswordGrantRequest { email, password })
            .await?;
        let session = read_session(response).await?;

        self.store_session(Some(session.clone())).await;
        self.notify(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<(), AuthFailure> {
        let query: Vec<(&str, &str)> = options
            .redirect_to
            .as_deref()
            .map(|redirect| vec![("redirect_to", redirect)])
            .unwrap_or_default();
        let url = self
            .backend
            .endpoint("auth/v1/signup", &query)
            .map_err(service_error)?;

        let body = SignUpRequestBody {
            email,
            password,
            data: SignUpMetadata {
                display_name: options.profile.display_name(),
                phone: options.profile.phone().map(|phone| phone.as_str()),
            },
        };
        let response = self.post_json(url, None, &body).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(auth_failure_from_response(status.as_u16(), &text))
    }

    async fn sign_out(&self) -> Result<(), AuthFailure> {
        let access_token = self.access_token().await;

        let remote = match access_token {
            Some(token) => self.request_logout(&token).await,
            None => Ok(()),
        };

        self.store_session(None).await;
        self.notify(SessionChange::signed_out());
        remote
    }
}

async fn run_auto_refresh(service: Weak<HostedAuthService>, check_interval: Duration) {
    let mut ticker = tokio::time::interval(check_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(service) = service.upgrade() else {
            return;
        };

        if !service.due_for_refresh().await {
            continue;
        }
        if let Err(error) = service.refresh_session().await {
            warn!(error = %error, "scheduled session refresh failed");
        }
    }
}

async fn read_session(response: reqwest::Response) -> Result<Session, AuthFailure> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(auth_failure_from_response(status.as_u16(), &text));
    }

    let token = response.json::<TokenResponse>().await.map_err(|error| {
        AuthFailure::ServiceError(format!("auth service returned malformed session: {error}"))
    })?;
    token.into_session(Utc::now()).map_err(service_error)
}

fn service_error(error: AppError) -> AuthFailure {
    AuthFailure::ServiceError(error.to_string())
}
