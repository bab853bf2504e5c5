use std::sync::Arc;
use std::time::Duration;

use techdesk_application::{RemoteAuthService, RoleStore};
use techdesk_core::{AppError, AppResult};
use techdesk_infrastructure::{
    FileSessionStore, HostedAuthService, HostedBackend, HostedRoleStore, InMemoryAuthService,
    InMemoryRoleStore,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dev_seed;
use crate::portal_config::{BackendProviderConfig, PortalConfig};

const AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Port implementations selected by `BACKEND_PROVIDER`.
pub struct BackendPorts {
    pub auth_service: Arc<dyn RemoteAuthService>,
    pub role_store: Arc<dyn RoleStore>,
    pub refresh_task: Option<JoinHandle<()>>,
}

pub async fn build_backend_ports(config: &PortalConfig) -> AppResult<BackendPorts> {
    match &config.backend {
        BackendProviderConfig::Memory => {
            if config.session_file.is_some() {
                warn!("SESSION_FILE is ignored by the memory backend");
            }

            let auth_service = Arc::new(InMemoryAuthService::new().with_auto_confirm(true));
            let role_store = Arc::new(InMemoryRoleStore::new());
            dev_seed::run(&auth_service, &role_store).await?;

            info!("using in-memory backend");
            Ok(BackendPorts {
                auth_service,
                role_store,
                refresh_task: None,
            })
        }
        BackendProviderConfig::Hosted(hosted) => {
            let http_client = reqwest::Client::builder()
                .timeout(config.auth_timeout)
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build http client: {error}"))
                })?;
            let backend = HostedBackend::new(http_client, &hosted.url, hosted.anon_key.as_str())?;
            let session_store = config.session_file.clone().map(FileSessionStore::new);

            let auth_service = Arc::new(HostedAuthService::new(backend.clone(), session_store));
            let refresh_task = auth_service.spawn_auto_refresh(AUTO_REFRESH_INTERVAL);
            let role_store = Arc::new(HostedRoleStore::new(backend, Arc::clone(&auth_service)));

            info!(backend_url = %hosted.url, "using hosted backend");
            Ok(BackendPorts {
                auth_service,
                role_store,
                refresh_task: Some(refresh_task),
            })
        }
    }
}
