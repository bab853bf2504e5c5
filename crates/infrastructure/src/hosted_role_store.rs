use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use techdesk_application::RoleStore;
use techdesk_core::{AppError, AppResult, UserId};
use techdesk_domain::Role;

use crate::{HostedAuthService, HostedBackend};

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

/// Reads roles from the hosted `user_roles` table.
///
/// Requests carry the signed-in account's token so row-level policies apply.
pub struct HostedRoleStore {
    backend: HostedBackend,
    auth_service: Arc<HostedAuthService>,
}

impl HostedRoleStore {
    /// Creates a role store sharing the auth adapter's session.
    #[must_use]
    pub fn new(backend: HostedBackend, auth_service: Arc<HostedAuthService>) -> Self {
        Self {
            backend,
            auth_service,
        }
    }
}

#[async_trait]
impl RoleStore for HostedRoleStore {
    async fn lookup_role(&self, user_id: UserId) -> AppResult<Option<Role>> {
        let user_filter = format!("eq.{user_id}");
        let url = self.backend.endpoint(
            "rest/v1/user_roles",
            &[
                ("select", "role"),
                ("user_id", user_filter.as_str()),
                ("limit", "1"),
            ],
        )?;
        let bearer = self
            .auth_service
            .access_token()
            .await
            .unwrap_or_else(|| self.backend.anon_key().to_owned());

        let response = self
            .backend
            .client()
            .get(url)
            .header("apikey", self.backend.anon_key())
            .bearer_auth(bearer)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("role lookup transport error: {error}")))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Internal(format!(
                "role lookup failed with transient status {status}"
            )));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized(
                "role lookup rejected the session token".to_owned(),
            ));
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(AppError::Forbidden(
                "role lookup denied by row-level policy".to_owned(),
            ));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<response body unavailable>".to_owned());
            return Err(AppError::Validation(format!(
                "role lookup failed with status {status}: {body}"
            )));
        }

        let rows = response
            .json::<Vec<RoleRow>>()
            .await
            .map_err(|error| AppError::Internal(format!("role lookup returned malformed rows: {error}")))?;

        rows.into_iter()
            .next()
            .map(|row| row.role.parse::<Role>())
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use techdesk_application::RoleStore;
    use techdesk_core::{AppError, UserId};
    use techdesk_domain::Role;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::HostedRoleStore;
    use crate::{HostedAuthService, HostedBackend};

    fn role_store(server: &MockServer) -> HostedRoleStore {
        let backend = HostedBackend::new(reqwest::Client::new(), &server.uri(), "anon-key")
            .unwrap_or_else(|error| panic!("{error}"));
        let auth_service = Arc::new(HostedAuthService::new(backend.clone(), None));
        HostedRoleStore::new(backend, auth_service)
    }

    #[tokio::test]
    async fn reads_role_row_for_user() {
        let server = MockServer::start().await;
        let user_id = UserId::new();
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .and(query_param("select", "role"))
            .and(query_param("user_id", format!("eq.{user_id}")))
            .and(header("apikey", "anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": "staff" }])))
            .expect(1)
            .mount(&server)
            .await;

        let role = role_store(&server).lookup_role(user_id).await;

        assert_eq!(role.ok().flatten(), Some(Role::Staff));
    }

    #[tokio::test]
    async fn missing_row_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let role = role_store(&server).lookup_role(UserId::new()).await;

        assert!(matches!(role, Ok(None)));
    }

    #[tokio::test]
    async fn unknown_role_value_is_a_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "role": "superuser" }])))
            .mount(&server)
            .await;

        let role = role_store(&server).lookup_role(UserId::new()).await;

        assert!(matches!(role, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn server_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let role = role_store(&server).lookup_role(UserId::new()).await;

        assert!(role.as_ref().is_err_and(AppError::is_transient));
    }

    #[tokio::test]
    async fn policy_denial_is_not_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let role = role_store(&server).lookup_role(UserId::new()).await;

        assert!(matches!(role, Err(AppError::Forbidden(_))));
    }
}
