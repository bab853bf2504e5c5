use techdesk_core::AppResult;
use techdesk_domain::Role;
use techdesk_infrastructure::{InMemoryAuthService, InMemoryRoleStore};
use tracing::info;

pub const DEV_SEED_PASSWORD: &str = "techdesk";
pub const DEV_SEED_ADMIN_EMAIL: &str = "admin@techdesk.local";
pub const DEV_SEED_STAFF_EMAIL: &str = "staff@techdesk.local";
pub const DEV_SEED_CUSTOMER_EMAIL: &str = "customer@techdesk.local";

/// Seeds one account per role into the in-memory backend.
///
/// The customer account has no role row and resolves through the default.
pub async fn run(auth_service: &InMemoryAuthService, role_store: &InMemoryRoleStore) -> AppResult<()> {
    let admin = auth_service
        .seed_account(DEV_SEED_ADMIN_EMAIL, DEV_SEED_PASSWORD)
        .await?;
    role_store.assign_role(admin.id(), Role::Admin).await;

    let staff = auth_service
        .seed_account(DEV_SEED_STAFF_EMAIL, DEV_SEED_PASSWORD)
        .await?;
    role_store.assign_role(staff.id(), Role::Staff).await;

    auth_service
        .seed_account(DEV_SEED_CUSTOMER_EMAIL, DEV_SEED_PASSWORD)
        .await?;

    info!(
        admin = DEV_SEED_ADMIN_EMAIL,
        staff = DEV_SEED_STAFF_EMAIL,
        customer = DEV_SEED_CUSTOMER_EMAIL,
        "seeded development accounts"
    );
    Ok(())
}
