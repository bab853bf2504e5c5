use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use techdesk_application::SignUpRequest;
use tracing::info;

use crate::dto::{
    AuthSignInRequest, AuthSignUpRequest, GenericMessageResponse, SessionSnapshotResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /auth/session - Current session, role and loading state.
pub async fn session_handler(State(state): State<AppState>) -> Json<SessionSnapshotResponse> {
    Json(SessionSnapshotResponse::from(&state.authority.snapshot()))
}

/// POST /auth/sign-in - Authenticate with email+password.
///
/// Acceptance only; the session shows up in `/auth/session` once the
/// change notification has been applied and the role resolved.
pub async fn sign_in_handler(
    State(state): State<AppState>,
    Json(payload): Json<AuthSignInRequest>,
) -> ApiResult<(StatusCode, Json<GenericMessageResponse>)> {
    state
        .authority
        .sign_in(&payload.email, &payload.password)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenericMessageResponse {
            message: "signed in".to_owned(),
        }),
    ))
}

/// POST /auth/sign-up - Register a new customer account.
pub async fn sign_up_handler(
    State(state): State<AppState>,
    Json(payload): Json<AuthSignUpRequest>,
) -> ApiResult<(StatusCode, Json<GenericMessageResponse>)> {
    state
        .authority
        .sign_up(SignUpRequest {
            email: payload.email,
            password: payload.password,
            display_name: payload.display_name,
            phone: payload.phone,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(GenericMessageResponse {
            message: "check your email to confirm your account".to_owned(),
        }),
    ))
}

/// POST /auth/sign-out - End the session. Never fails.
pub async fn sign_out_handler(State(state): State<AppState>) -> Json<SessionSnapshotResponse> {
    state.authority.sign_out().await;
    Json(SessionSnapshotResponse::from(&state.authority.snapshot()))
}

/// POST /auth/refresh-role - Re-read the role of the signed-in account.
pub async fn refresh_role_handler(State(state): State<AppState>) -> Json<SessionSnapshotResponse> {
    state.authority.refresh_role().await;
    Json(SessionSnapshotResponse::from(&state.authority.snapshot()))
}

/// GET /auth - Sign-in entry point that guarded screens redirect to.
pub async fn sign_in_page_handler() -> Json<GenericMessageResponse> {
    Json(GenericMessageResponse {
        message: "sign in with POST /auth/sign-in".to_owned(),
    })
}

/// GET /auth/callback - Landing target of the confirmation email link.
pub async fn confirmation_callback_handler() -> Json<GenericMessageResponse> {
    info!("email confirmation link followed");
    Json(GenericMessageResponse {
        message: "email confirmed; sign in to continue".to_owned(),
    })
}
