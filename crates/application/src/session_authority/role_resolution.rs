use techdesk_core::UserId;
use techdesk_domain::Role;
use tracing::{debug, info, warn};

use super::{AuthorityInner, PendingRoleLookup};

impl AuthorityInner {
    /// Looks up the role for `pending` and publishes it unless superseded.
    pub(super) async fn resolve_role(&self, pending: PendingRoleLookup) {
        let role = self.lookup_role_or_default(pending.user_id).await;

        let transitions = self.transitions.lock().await;
        if self.is_stopped() {
            debug!(user_id = %pending.user_id, "authority stopped; dropping role lookup");
            return;
        }
        if transitions.generation != pending.generation {
            debug!(
                user_id = %pending.user_id,
                generation = pending.generation,
                current = transitions.generation,
                "discarding stale role lookup"
            );
            return;
        }

        let current = self.snapshot_tx.borrow().clone();
        match current.resolved(role) {
            Some(next) => {
                info!(user_id = %pending.user_id, role = role.as_str(), "role resolved");
                self.publish(next);
            }
            None => debug!(
                state = current.state().as_str(),
                "role lookup finished outside of role resolution"
            ),
        }
    }

    /// Never fails: every failure path ends in the least-privileged role.
    ///
    /// Transport errors and timeouts are retried up to the configured
    /// attempt count. A missing row or an unknown stored value is final.
    async fn lookup_role_or_default(&self, user_id: UserId) -> Role {
        let attempts = self.config.role_lookup_attempts.max(1);
        let mut attempt = 0_u8;

        while attempt < attempts {
            attempt = attempt.saturating_add(1);

            let outcome = tokio::time::timeout(
                self.config.operation_timeout,
                self.role_store.lookup_role(user_id),
            )
            .await;

            match outcome {
                Ok(Ok(Some(role))) => return role,
                Ok(Ok(None)) => {
                    info!(%user_id, "no role row; using default role");
                    return Role::default();
                }
                Ok(Err(error)) if !error.is_transient() => {
                    warn!(%user_id, error = %error, "role lookup rejected; using default role");
                    return Role::default();
                }
                Ok(Err(error)) => {
                    warn!(%user_id, attempt, error = %error, "role lookup failed");
                }
                Err(_) => {
                    warn!(%user_id, attempt, "role lookup timed out");
                }
            }

            if attempt < attempts {
                let delay = self
                    .config
                    .role_lookup_backoff
                    .saturating_mul(u32::from(attempt));
                tokio::time::sleep(delay).await;
            }
        }

        warn!(%user_id, attempts, "role lookup exhausted retries; using default role");
        Role::default()
    }
}
