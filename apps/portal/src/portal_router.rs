use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use techdesk_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/", get(handlers::public::public_entry_handler))
        .route("/auth", get(handlers::auth::sign_in_page_handler))
        .route(
            "/auth/callback",
            get(handlers::auth::confirmation_callback_handler),
        )
        .route("/auth/session", get(handlers::auth::session_handler))
        .route("/auth/sign-in", post(handlers::auth::sign_in_handler))
        .route("/auth/sign-up", post(handlers::auth::sign_up_handler))
        .route("/auth/sign-out", post(handlers::auth::sign_out_handler))
        .route(
            "/auth/refresh-role",
            post(handlers::auth::refresh_role_handler),
        )
        .route("/home", get(handlers::dashboards::home_handler))
        .route("/admin", get(handlers::dashboards::admin_dashboard_handler))
        .route("/staff", get(handlers::dashboards::staff_dashboard_handler))
        .route(
            "/dashboard",
            get(handlers::dashboards::customer_dashboard_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state))
}
