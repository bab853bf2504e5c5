use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use techdesk_application::{AuthorityConfig, AuthoritySnapshot, RoleStore, SessionAuthority};
use techdesk_core::{AppResult, UserId};
use techdesk_domain::Role;
use techdesk_infrastructure::{InMemoryAuthService, InMemoryRoleStore};

use super::auth::{
    refresh_role_handler, session_handler, sign_in_handler, sign_out_handler, sign_up_handler,
};
use super::dashboards::{
    admin_dashboard_handler, customer_dashboard_handler, home_handler, staff_dashboard_handler,
};
use super::health::health_handler;
use super::public::public_entry_handler;
use crate::dev_seed::{
    self, DEV_SEED_ADMIN_EMAIL, DEV_SEED_CUSTOMER_EMAIL, DEV_SEED_PASSWORD, DEV_SEED_STAFF_EMAIL,
};
use crate::dto::{AuthSignInRequest, AuthSignUpRequest, PublicEntryQuery};
use crate::state::AppState;

struct StalledRoleStore;

#[async_trait]
impl RoleStore for StalledRoleStore {
    async fn lookup_role(&self, _user_id: UserId) -> AppResult<Option<Role>> {
        std::future::pending().await
    }
}

fn fast_config() -> AuthorityConfig {
    AuthorityConfig {
        operation_timeout: Duration::from_millis(500),
        role_lookup_attempts: 1,
        role_lookup_backoff: Duration::from_millis(5),
        sign_up_redirect: Some("http://localhost:3002/auth/callback".to_owned()),
    }
}

struct Portal {
    state: AppState,
    auth_service: Arc<InMemoryAuthService>,
    role_store: Arc<InMemoryRoleStore>,
}

async fn seeded_portal() -> Portal {
    let auth_service = Arc::new(InMemoryAuthService::new());
    let role_store = Arc::new(InMemoryRoleStore::new());
    dev_seed::run(&auth_service, &role_store)
        .await
        .unwrap_or_else(|error| panic!("{error}"));

    let authority = SessionAuthority::start(
        auth_service.clone(),
        role_store.clone(),
        fast_config(),
    )
    .await;
    settle(&authority, |snapshot| !snapshot.loading()).await;

    Portal {
        state: AppState { authority },
        auth_service,
        role_store,
    }
}

async fn settle<F>(authority: &SessionAuthority, predicate: F) -> AuthoritySnapshot
where
    F: FnMut(&AuthoritySnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), authority.wait_for(predicate))
        .await
        .unwrap_or_else(|_| panic!("authority did not reach the expected state"))
}

async fn sign_in_as(state: &AppState, email: &str) {
    let accepted = sign_in_handler(
        State(state.clone()),
        Json(AuthSignInRequest {
            email: email.to_owned(),
            password: DEV_SEED_PASSWORD.to_owned(),
        }),
    )
    .await;
    assert!(matches!(accepted, Ok((status, _)) if status == StatusCode::ACCEPTED));

    settle(&state.authority, |snapshot| {
        !snapshot.loading() && snapshot.user().is_some_and(|user| user.email() == email)
    })
    .await;
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
}

#[tokio::test]
async fn health_reports_ok() {
    assert_eq!(health_handler().await.0.status, "ok");
}

#[tokio::test]
async fn startup_without_stored_session_is_signed_out() {
    let portal = seeded_portal().await;

    let session = session_handler(State(portal.state.clone())).await.0;

    assert_eq!(session.state, "unauthenticated");
    assert!(!session.loading);
    assert!(session.user.is_none());
    assert!(session.landing_path.is_none());
}

#[tokio::test]
async fn signed_out_dashboards_redirect_to_sign_in() {
    let portal = seeded_portal().await;

    for response in [
        admin_dashboard_handler(State(portal.state.clone())).await,
        customer_dashboard_handler(State(portal.state.clone())).await,
        home_handler(State(portal.state.clone())).await,
    ] {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/auth"));
    }
}

#[tokio::test]
async fn staff_sees_staff_dashboard_only() {
    let portal = seeded_portal().await;
    sign_in_as(&portal.state, DEV_SEED_STAFF_EMAIL).await;

    let session = session_handler(State(portal.state.clone())).await.0;
    assert_eq!(session.state, "authenticated");
    assert_eq!(session.role.as_deref(), Some("staff"));
    assert_eq!(session.landing_path.as_deref(), Some("/staff"));

    let staff = staff_dashboard_handler(State(portal.state.clone())).await;
    assert_eq!(staff.status(), StatusCode::OK);

    let admin = admin_dashboard_handler(State(portal.state.clone())).await;
    assert_eq!(admin.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&admin), Some("/?notice=unauthorized"));

    let home = home_handler(State(portal.state.clone())).await;
    assert_eq!(home.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&home), Some("/staff"));
}

#[tokio::test]
async fn account_without_role_row_lands_on_customer_dashboard() {
    let portal = seeded_portal().await;
    sign_in_as(&portal.state, DEV_SEED_CUSTOMER_EMAIL).await;

    let customer = customer_dashboard_handler(State(portal.state.clone())).await;
    assert_eq!(customer.status(), StatusCode::OK);

    let home = home_handler(State(portal.state.clone())).await;
    assert_eq!(location(&home), Some("/dashboard"));
}

#[tokio::test]
async fn dashboards_render_placeholder_while_role_is_resolving() {
    let auth_service = Arc::new(InMemoryAuthService::new());
    let identity = auth_service
        .seed_account(DEV_SEED_ADMIN_EMAIL, DEV_SEED_PASSWORD)
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let config = AuthorityConfig {
        operation_timeout: Duration::from_secs(30),
        ..fast_config()
    };
    let authority = SessionAuthority::start(auth_service, Arc::new(StalledRoleStore), config).await;
    settle(&authority, |snapshot| !snapshot.loading()).await;
    let state = AppState {
        authority: authority.clone(),
    };

    let accepted = sign_in_handler(
        State(state.clone()),
        Json(AuthSignInRequest {
            email: DEV_SEED_ADMIN_EMAIL.to_owned(),
            password: DEV_SEED_PASSWORD.to_owned(),
        }),
    )
    .await;
    assert!(accepted.is_ok());
    settle(&authority, |snapshot| {
        snapshot.loading() && snapshot.user().is_some_and(|user| user.id() == identity.id())
    })
    .await;

    for response in [
        admin_dashboard_handler(State(state.clone())).await,
        staff_dashboard_handler(State(state.clone())).await,
        home_handler(State(state.clone())).await,
    ] {
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(location(&response).is_none());
    }

    authority.shutdown();
}

#[tokio::test]
async fn wrong_password_is_unauthorized_and_leaves_state_untouched() {
    let portal = seeded_portal().await;

    let result = sign_in_handler(
        State(portal.state.clone()),
        Json(AuthSignInRequest {
            email: DEV_SEED_ADMIN_EMAIL.to_owned(),
            password: "not-the-password".to_owned(),
        }),
    )
    .await;

    let response = result.into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        session_handler(State(portal.state.clone())).await.0.state,
        "unauthenticated"
    );
}

#[tokio::test]
async fn unreachable_auth_service_is_bad_gateway() {
    let portal = seeded_portal().await;
    portal.auth_service.set_unavailable(true);

    let result = sign_in_handler(
        State(portal.state.clone()),
        Json(AuthSignInRequest {
            email: DEV_SEED_ADMIN_EMAIL.to_owned(),
            password: DEV_SEED_PASSWORD.to_owned(),
        }),
    )
    .await;

    assert_eq!(result.into_response().status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn sign_up_validates_input_before_calling_service() {
    let portal = seeded_portal().await;

    let result = sign_up_handler(
        State(portal.state.clone()),
        Json(AuthSignUpRequest {
            email: "new@techdesk.local".to_owned(),
            password: "123".to_owned(),
            display_name: "New Customer".to_owned(),
            phone: None,
        }),
    )
    .await;

    assert_eq!(result.into_response().status(), StatusCode::BAD_REQUEST);
    assert!(
        portal
            .auth_service
            .find_user_id("new@techdesk.local")
            .await
            .is_none()
    );
}

#[tokio::test]
async fn sign_up_registers_without_signing_in() {
    let portal = seeded_portal().await;

    let result = sign_up_handler(
        State(portal.state.clone()),
        Json(AuthSignUpRequest {
            email: "new@techdesk.local".to_owned(),
            password: "hunter22".to_owned(),
            display_name: "New Customer".to_owned(),
            phone: Some("+91 98765 43210".to_owned()),
        }),
    )
    .await;

    assert!(matches!(result, Ok((status, _)) if status == StatusCode::ACCEPTED));
    assert_eq!(
        portal
            .auth_service
            .find_profile("new@techdesk.local")
            .await
            .and_then(|profile| profile.phone().map(|phone| phone.as_str().to_owned())),
        Some("+919876543210".to_owned())
    );
    assert_eq!(
        session_handler(State(portal.state.clone())).await.0.state,
        "unauthenticated"
    );
}

#[tokio::test]
async fn sign_out_always_returns_signed_out_snapshot() {
    let portal = seeded_portal().await;
    sign_in_as(&portal.state, DEV_SEED_ADMIN_EMAIL).await;
    portal.auth_service.set_unavailable(true);

    let session = sign_out_handler(State(portal.state.clone())).await.0;

    assert_eq!(session.state, "unauthenticated");
    assert!(session.user.is_none());
    assert!(session.role.is_none());
    assert!(!session.loading);
}

#[tokio::test]
async fn refresh_role_picks_up_role_changes() {
    let portal = seeded_portal().await;
    sign_in_as(&portal.state, DEV_SEED_CUSTOMER_EMAIL).await;

    let user_id = portal
        .auth_service
        .find_user_id(DEV_SEED_CUSTOMER_EMAIL)
        .await
        .unwrap_or_else(|| panic!("seeded customer is missing"));
    portal.role_store.assign_role(user_id, Role::Staff).await;

    let session = refresh_role_handler(State(portal.state.clone())).await.0;

    assert_eq!(session.role.as_deref(), Some("staff"));
    assert_eq!(session.landing_path.as_deref(), Some("/staff"));
}

#[tokio::test]
async fn public_entry_explains_unauthorized_notice() {
    let plain = public_entry_handler(Query(PublicEntryQuery::default())).await.0;
    let notice = public_entry_handler(Query(PublicEntryQuery {
        notice: Some("unauthorized".to_owned()),
    }))
    .await
    .0;

    assert_ne!(plain.message, notice.message);
}

#[tokio::test]
async fn snapshot_response_serializes_without_tokens() {
    let portal = seeded_portal().await;
    sign_in_as(&portal.state, DEV_SEED_ADMIN_EMAIL).await;

    let session = session_handler(State(portal.state.clone())).await.0;
    let body = serde_json::to_string(&session).unwrap_or_else(|error| panic!("{error}"));

    assert!(body.contains("\"role\":\"admin\""));
    assert!(!body.contains("token"));
}
