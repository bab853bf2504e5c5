use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use techdesk_application::AuthorityConfig;
use techdesk_core::AppError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct HostedBackendConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub enum BackendProviderConfig {
    Memory,
    Hosted(HostedBackendConfig),
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub portal_host: String,
    pub portal_port: u16,
    pub frontend_url: String,
    pub backend: BackendProviderConfig,
    pub auth_redirect_url: String,
    pub session_file: Option<PathBuf>,
    pub auth_timeout: Duration,
    pub role_lookup_attempts: u8,
    pub role_lookup_backoff: Duration,
}

impl PortalConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &str| {
            optional(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))
        };

        let portal_host = optional("PORTAL_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let portal_port = parse_or("PORTAL_PORT", optional("PORTAL_PORT"), 3002_u16)?;
        let frontend_url =
            optional("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());

        let backend = match optional("BACKEND_PROVIDER")
            .unwrap_or_else(|| "memory".to_owned())
            .as_str()
        {
            "memory" => BackendProviderConfig::Memory,
            "hosted" => BackendProviderConfig::Hosted(HostedBackendConfig {
                url: required("BACKEND_URL")?,
                anon_key: required("BACKEND_ANON_KEY")?,
            }),
            other => {
                return Err(AppError::Validation(format!(
                    "BACKEND_PROVIDER must be either 'memory' or 'hosted', got '{other}'"
                )));
            }
        };

        let auth_redirect_url = optional("AUTH_REDIRECT_URL")
            .unwrap_or_else(|| "http://localhost:3002/auth/callback".to_owned());
        let session_file = optional("SESSION_FILE").map(PathBuf::from);

        let auth_timeout_secs = parse_or("AUTH_TIMEOUT_SECS", optional("AUTH_TIMEOUT_SECS"), 10_u64)?;
        if auth_timeout_secs == 0 {
            return Err(AppError::Validation(
                "AUTH_TIMEOUT_SECS must be greater than zero".to_owned(),
            ));
        }
        let role_lookup_attempts = parse_or(
            "ROLE_LOOKUP_ATTEMPTS",
            optional("ROLE_LOOKUP_ATTEMPTS"),
            2_u8,
        )?;
        if role_lookup_attempts == 0 {
            return Err(AppError::Validation(
                "ROLE_LOOKUP_ATTEMPTS must be at least 1".to_owned(),
            ));
        }
        let role_lookup_backoff_ms = parse_or(
            "ROLE_LOOKUP_BACKOFF_MS",
            optional("ROLE_LOOKUP_BACKOFF_MS"),
            250_u64,
        )?;

        Ok(Self {
            portal_host,
            portal_port,
            frontend_url,
            backend,
            auth_redirect_url,
            session_file,
            auth_timeout: Duration::from_secs(auth_timeout_secs),
            role_lookup_attempts,
            role_lookup_backoff: Duration::from_millis(role_lookup_backoff_ms),
        })
    }

    pub fn authority_config(&self) -> AuthorityConfig {
        AuthorityConfig {
            operation_timeout: self.auth_timeout,
            role_lookup_attempts: self.role_lookup_attempts,
            role_lookup_backoff: self.role_lookup_backoff,
            sign_up_redirect: Some(self.auth_redirect_url.clone()),
        }
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.portal_host).map_err(|error| {
            AppError::Internal(format!(
                "invalid PORTAL_HOST '{}': {error}",
                self.portal_host
            ))
        })?;
        Ok(SocketAddr::from((host, self.portal_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        None => Ok(default),
    }
}
