use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use techdesk_application::RoleStore;
use techdesk_core::{AppError, AppResult, UserId};
use techdesk_domain::Role;
use tokio::sync::RwLock;

/// In-memory role table for local development and tests.
#[derive(Default)]
pub struct InMemoryRoleStore {
    roles: RwLock<HashMap<UserId, Role>>,
    unavailable: AtomicBool,
}

impl InMemoryRoleStore {
    /// Creates an empty role table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns or replaces the role for one account.
    pub async fn assign_role(&self, user_id: UserId, role: Role) {
        self.roles.write().await.insert(user_id, role);
    }

    /// Removes the role row for one account.
    pub async fn remove_role(&self, user_id: UserId) {
        self.roles.write().await.remove(&user_id);
    }

    /// Makes every lookup fail with a transient error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn lookup_role(&self, user_id: UserId) -> AppResult<Option<Role>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Internal("role store unavailable".to_owned()));
        }

        Ok(self.roles.read().await.get(&user_id).copied())
    }
}
