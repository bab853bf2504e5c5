//! Client-side authority over the current session and its role.
//!
//! The authority is the single writer of [`AuthoritySnapshot`]. It keeps the
//! snapshot in step with the remote auth service through one change
//! subscription and resolves the role of every new account from the role
//! store. Consumers read snapshots through a `watch` channel.

mod role_resolution;
mod snapshot;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use techdesk_core::{AppError, AuthFailure, Session, UserId};
use techdesk_domain::{EmailAddress, SignUpProfile, validate_password};
use tokio::sync::{Mutex, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::{RemoteAuthService, RoleStore, SessionSubscription, SignUpOptions};

pub use snapshot::{AuthorityState, AuthoritySnapshot};

/// Tunables for [`SessionAuthority`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityConfig {
    /// Upper bound for every call to the auth service or role store.
    pub operation_timeout: Duration,
    /// Number of role lookups attempted before defaulting to the least-privileged role.
    pub role_lookup_attempts: u8,
    /// Delay before the second lookup attempt; grows linearly per attempt.
    pub role_lookup_backoff: Duration,
    /// Where sign-up confirmation links return to.
    pub sign_up_redirect: Option<String>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_secs(10),
            role_lookup_attempts: 2,
            role_lookup_backoff: Duration::from_millis(250),
            sign_up_redirect: None,
        }
    }
}

impl AuthorityConfig {
    /// Worst-case time a role lookup may keep the snapshot loading.
    #[must_use]
    pub fn role_lookup_budget(&self) -> Duration {
        let attempts = u32::from(self.role_lookup_attempts.max(1));
        let backoff_steps: u32 = (1..attempts).sum();
        self.operation_timeout
            .saturating_mul(attempts)
            .saturating_add(self.role_lookup_backoff.saturating_mul(backoff_steps))
    }

    /// Worst-case time from startup until the first settled snapshot.
    #[must_use]
    pub fn startup_budget(&self) -> Duration {
        self.operation_timeout
            .saturating_add(self.role_lookup_budget())
    }
}

/// Form input for creating an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpRequest {
    /// Account email.
    pub email: String,
    /// Plaintext password, forwarded to the auth service only.
    pub password: String,
    /// Name shown on dashboards and invoices.
    pub display_name: String,
    /// Optional contact number.
    pub phone: Option<String>,
}

/// Role lookup scheduled by a transition. Stale once `generation` moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRoleLookup {
    generation: u64,
    user_id: UserId,
}

#[derive(Debug, Default)]
struct TransitionState {
    generation: u64,
}

struct AuthorityInner {
    auth_service: Arc<dyn RemoteAuthService>,
    role_store: Arc<dyn RoleStore>,
    config: AuthorityConfig,
    transitions: Mutex<TransitionState>,
    snapshot_tx: watch::Sender<AuthoritySnapshot>,
    listener: OnceLock<AbortHandle>,
    startup: OnceLock<AbortHandle>,
    /// Set on shutdown; in-flight role lookups finish without publishing.
    stopped: AtomicBool,
}

/// Owner of the authoritative session, role and loading state.
///
/// Cloning is cheap and every clone drives the same state.
#[derive(Clone)]
pub struct SessionAuthority {
    inner: Arc<AuthorityInner>,
}

impl SessionAuthority {
    /// Creates the authority and starts both startup paths.
    ///
    /// Registers the change subscription, then restores any persisted
    /// session in the background. Whichever path settles first wins; the
    /// returned authority is still `Uninitialized` until then.
    pub async fn start(
        auth_service: Arc<dyn RemoteAuthService>,
        role_store: Arc<dyn RoleStore>,
        config: AuthorityConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(AuthoritySnapshot::uninitialized());
        let subscription = auth_service.subscribe().await;

        let inner = Arc::new(AuthorityInner {
            auth_service,
            role_store,
            config,
            transitions: Mutex::new(TransitionState::default()),
            snapshot_tx,
            listener: OnceLock::new(),
            startup: OnceLock::new(),
            stopped: AtomicBool::new(false),
        });

        let listener = tokio::spawn(run_listener(Arc::downgrade(&inner), subscription));
        let _ = inner.listener.set(listener.abort_handle());

        let startup = tokio::spawn(run_startup(Arc::clone(&inner)));
        let _ = inner.startup.set(startup.abort_handle());

        debug!("session authority started");
        Self { inner }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AuthoritySnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Returns a receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthoritySnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Waits until a snapshot matches `predicate` and returns it.
    pub async fn wait_for<F>(&self, mut predicate: F) -> AuthoritySnapshot
    where
        F: FnMut(&AuthoritySnapshot) -> bool,
    {
        let mut receiver = self.subscribe();
        match receiver.wait_for(|snapshot| predicate(snapshot)).await {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives in `self`, so it cannot be dropped while we wait.
            Err(_) => self.snapshot(),
        }
    }

    /// Waits for the first snapshot that is not loading.
    pub async fn wait_until_settled(&self) -> AuthoritySnapshot {
        self.wait_for(|snapshot| !snapshot.loading()).await
    }

    /// Checks credentials with the auth service.
    ///
    /// Success does not touch the snapshot; the service's change
    /// notification drives the transition. Failures leave the snapshot
    /// unchanged and are returned verbatim.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthFailure> {
        let email = EmailAddress::new(email).map_err(invalid_input)?;
        if password.is_empty() {
            return Err(AuthFailure::InvalidInput("password is required".to_owned()));
        }

        let outcome = tokio::time::timeout(
            self.inner.config.operation_timeout,
            self.inner
                .auth_service
                .sign_in_with_password(email.as_str(), password),
        )
        .await
        .map_err(|_| timed_out("sign-in", self.inner.config.operation_timeout))?;

        match outcome {
            Ok(session) => {
                info!(user_id = %session.identity().id(), "sign-in accepted");
                Ok(())
            }
            Err(failure) => {
                info!(reason = %failure, "sign-in rejected");
                Err(failure)
            }
        }
    }

    /// Registers a new account. Does not sign in.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<(), AuthFailure> {
        let email = EmailAddress::new(request.email.as_str()).map_err(invalid_input)?;
        validate_password(&request.password).map_err(invalid_input)?;
        let profile = SignUpProfile::new(&request.display_name, request.phone.as_deref())
            .map_err(invalid_input)?;

        let options = SignUpOptions {
            redirect_to: self.inner.config.sign_up_redirect.clone(),
            profile,
        };

        tokio::time::timeout(
            self.inner.config.operation_timeout,
            self.inner
                .auth_service
                .sign_up(email.as_str(), &request.password, options),
        )
        .await
        .map_err(|_| timed_out("sign-up", self.inner.config.operation_timeout))??;

        info!(email = email.as_str(), "sign-up submitted");
        Ok(())
    }

    /// Ends the session remotely, then clears local state unconditionally.
    pub async fn sign_out(&self) {
        match tokio::time::timeout(
            self.inner.config.operation_timeout,
            self.inner.auth_service.sign_out(),
        )
        .await
        {
            Ok(Ok(())) => debug!("remote sign-out completed"),
            Ok(Err(failure)) => {
                warn!(reason = %failure, "remote sign-out failed; clearing local session");
            }
            Err(_) => warn!("remote sign-out timed out; clearing local session"),
        }

        self.inner.apply_session(None, None).await;
        info!("signed out");
    }

    /// Re-reads the role of the signed-in account. No-op without a user.
    pub async fn refresh_role(&self) {
        let pending = {
            let mut transitions = self.inner.transitions.lock().await;
            let current = self.snapshot();
            let Some(session) = current.session() else {
                debug!("role refresh skipped without a signed-in user");
                return;
            };

            transitions.generation += 1;
            let pending = PendingRoleLookup {
                generation: transitions.generation,
                user_id: session.identity().id(),
            };
            self.inner.publish(AuthoritySnapshot::resolving(session.clone()));
            pending
        };

        debug!(user_id = %pending.user_id, "refreshing role");
        self.inner.resolve_role(pending).await;
    }

    /// Releases the change subscription and stops startup work.
    ///
    /// Role lookups already in flight are discarded. The last published
    /// snapshot stays readable.
    pub fn shutdown(&self) {
        self.inner.abort_tasks();
        debug!("session authority shut down");
    }
}

impl AuthorityInner {
    fn publish(&self, snapshot: AuthoritySnapshot) {
        debug!(state = snapshot.state().as_str(), "publishing snapshot");
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Moves the snapshot to match `next`.
    ///
    /// With `expected_generation`, the change is dropped if any other
    /// transition happened since the caller captured that generation.
    async fn apply_session(
        &self,
        next: Option<Session>,
        expected_generation: Option<u64>,
    ) -> Option<PendingRoleLookup> {
        let mut transitions = self.transitions.lock().await;
        if let Some(expected) = expected_generation
            && expected != transitions.generation
        {
            debug!(
                expected,
                current = transitions.generation,
                "discarding superseded session update"
            );
            return None;
        }

        let current = self.snapshot_tx.borrow().clone();
        match next {
            None => {
                if current.state() == AuthorityState::Unauthenticated {
                    return None;
                }

                transitions.generation += 1;
                self.publish(AuthoritySnapshot::unauthenticated());
                None
            }
            Some(session) => {
                if let Some(existing) = current.session()
                    && existing.same_identity(&session)
                {
                    if *existing != session {
                        self.publish(current.with_session(session));
                    }
                    return None;
                }

                transitions.generation += 1;
                let pending = PendingRoleLookup {
                    generation: transitions.generation,
                    user_id: session.identity().id(),
                };
                self.publish(AuthoritySnapshot::resolving(session));
                Some(pending)
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn abort_tasks(&self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(listener) = self.listener.get() {
            listener.abort();
        }
        if let Some(startup) = self.startup.get() {
            startup.abort();
        }
    }
}

impl Drop for AuthorityInner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

async fn run_startup(inner: Arc<AuthorityInner>) {
    let restored = match tokio::time::timeout(
        inner.config.operation_timeout,
        inner.auth_service.restore_session(),
    )
    .await
    {
        Ok(Ok(session)) => session,
        Ok(Err(error)) => {
            warn!(error = %error, "session restore failed; starting signed out");
            None
        }
        Err(_) => {
            warn!("session restore timed out; starting signed out");
            None
        }
    };

    debug!(restored = restored.is_some(), "startup session restore finished");
    if let Some(pending) = inner.apply_session(restored, Some(0)).await {
        inner.resolve_role(pending).await;
    }
}

async fn run_listener(inner: Weak<AuthorityInner>, mut subscription: SessionSubscription) {
    while let Some(change) = subscription.next().await {
        let Some(authority) = inner.upgrade() else {
            break;
        };

        debug!(event = change.event.as_str(), "session change received");
        if let Some(pending) = authority.apply_session(change.session, None).await {
            tokio::spawn(async move {
                authority.resolve_role(pending).await;
            });
        }
    }

    debug!("session change subscription closed");
}

fn invalid_input(error: AppError) -> AuthFailure {
    match error {
        AppError::Validation(message) => AuthFailure::InvalidInput(message),
        other => AuthFailure::InvalidInput(other.to_string()),
    }
}

fn timed_out(operation: &str, timeout: Duration) -> AuthFailure {
    AuthFailure::NetworkError(format!(
        "{operation} timed out after {}ms",
        timeout.as_millis()
    ))
}
