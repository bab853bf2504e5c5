//! TechDesk portal composition root.

#![forbid(unsafe_code)]

mod dev_seed;
mod dto;
mod error;
mod handlers;
mod portal_config;
mod portal_router;
mod portal_services;
mod state;

use techdesk_application::SessionAuthority;
use techdesk_core::AppError;
use tracing::{info, warn};

use crate::portal_config::PortalConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    portal_config::init_tracing();

    let config = PortalConfig::load()?;
    let authority_config = config.authority_config();
    let startup_budget = authority_config.startup_budget();

    let ports = portal_services::build_backend_ports(&config).await?;
    let authority =
        SessionAuthority::start(ports.auth_service, ports.role_store, authority_config).await;

    match tokio::time::timeout(startup_budget, authority.wait_until_settled()).await {
        Ok(snapshot) => info!(state = snapshot.state().as_str(), "session authority settled"),
        Err(_) => warn!(
            budget_ms = startup_budget.as_millis(),
            "session authority still resolving; serving with loading state"
        ),
    }

    let app = portal_router::build_router(
        AppState {
            authority: authority.clone(),
        },
        &config.frontend_url,
    )?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "techdesk-portal listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|error| AppError::Internal(format!("portal server error: {error}")));

    authority.shutdown();
    if let Some(refresh_task) = ports.refresh_task {
        refresh_task.abort();
    }
    info!("techdesk-portal stopped");

    served
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
