use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use techdesk_application::{AuthoritySnapshot, GuardDecision, route_guard};
use techdesk_domain::Role;
use tracing::warn;

use crate::dto::{DashboardResponse, GenericMessageResponse};
use crate::state::AppState;

/// Notice appended to the public entry point after a role mismatch.
pub const UNAUTHORIZED_NOTICE: &str = "unauthorized";

/// GET /admin
pub async fn admin_dashboard_handler(State(state): State<AppState>) -> Response {
    guarded_dashboard(&state.authority.snapshot(), Role::Admin)
}

/// GET /staff
pub async fn staff_dashboard_handler(State(state): State<AppState>) -> Response {
    guarded_dashboard(&state.authority.snapshot(), Role::Staff)
}

/// GET /dashboard
pub async fn customer_dashboard_handler(State(state): State<AppState>) -> Response {
    guarded_dashboard(&state.authority.snapshot(), Role::Customer)
}

/// GET /home - Send the signed-in account to its own dashboard.
pub async fn home_handler(State(state): State<AppState>) -> Response {
    let snapshot = state.authority.snapshot();
    match route_guard::evaluate(&snapshot, None) {
        GuardDecision::Allow => match route_guard::landing_path(&snapshot) {
            Some(path) => Redirect::to(path).into_response(),
            None => loading_response(),
        },
        decision => guard_rejection(decision),
    }
}

fn guarded_dashboard(snapshot: &AuthoritySnapshot, required: Role) -> Response {
    match route_guard::evaluate(snapshot, Some(required)) {
        GuardDecision::Allow => {
            let email = snapshot
                .user()
                .map(|user| user.email().to_owned())
                .unwrap_or_default();
            let role = snapshot.role().unwrap_or_default();

            Json(DashboardResponse {
                dashboard: required.dashboard_path().to_owned(),
                email,
                role: role.as_str().to_owned(),
            })
            .into_response()
        }
        decision => guard_rejection(decision),
    }
}

fn guard_rejection(decision: GuardDecision) -> Response {
    let Some(target) = decision.redirect_target() else {
        return loading_response();
    };

    if let GuardDecision::Forbidden { required, actual } = decision {
        warn!(
            required = required.as_str(),
            actual = actual.as_str(),
            "blocked dashboard for mismatched role"
        );
        return Redirect::to(&format!("{target}?notice={UNAUTHORIZED_NOTICE}")).into_response();
    }

    Redirect::to(target).into_response()
}

fn loading_response() -> Response {
    (
        StatusCode::ACCEPTED,
        Json(GenericMessageResponse {
            message: "session is loading".to_owned(),
        }),
    )
        .into_response()
}
