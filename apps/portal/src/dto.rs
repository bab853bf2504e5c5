use serde::{Deserialize, Serialize};
use techdesk_application::{AuthoritySnapshot, route_guard};
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Generic message response.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/generic-message-response.ts"
)]
pub struct GenericMessageResponse {
    pub message: String,
}

/// Incoming payload for email/password sign-in.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/auth-sign-in-request.ts"
)]
pub struct AuthSignInRequest {
    pub email: String,
    pub password: String,
}

/// Incoming payload for account registration.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/auth-sign-up-request.ts"
)]
pub struct AuthSignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Signed-in account as exposed to the console.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/session-user-response.ts"
)]
pub struct SessionUserResponse {
    pub id: String,
    pub email: String,
    pub expires_at: String,
}

/// Current session state. Tokens are never exposed.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/session-snapshot-response.ts"
)]
pub struct SessionSnapshotResponse {
    pub state: String,
    pub loading: bool,
    pub user: Option<SessionUserResponse>,
    pub role: Option<String>,
    pub landing_path: Option<String>,
}

impl From<&AuthoritySnapshot> for SessionSnapshotResponse {
    fn from(snapshot: &AuthoritySnapshot) -> Self {
        Self {
            state: snapshot.state().as_str().to_owned(),
            loading: snapshot.loading(),
            user: snapshot.session().map(|session| SessionUserResponse {
                id: session.identity().id().to_string(),
                email: session.identity().email().to_owned(),
                expires_at: session.expires_at().to_rfc3339(),
            }),
            role: snapshot.role().map(|role| role.as_str().to_owned()),
            landing_path: route_guard::landing_path(snapshot).map(ToOwned::to_owned),
        }
    }
}

/// Payload rendered by a role dashboard.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/dashboard-response.ts"
)]
pub struct DashboardResponse {
    pub dashboard: String,
    pub email: String,
    pub role: String,
}

/// Query parameters accepted by the public entry point.
#[derive(Debug, Default, Deserialize)]
pub struct PublicEntryQuery {
    pub notice: Option<String>,
}
