//! JSON shapes exchanged with the hosted auth endpoints.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use techdesk_core::{AppError, AppResult, AuthFailure, Identity, Session, UserId};

#[derive(Debug, Serialize)]
pub(super) struct PasswordGrantRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshGrantRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpRequestBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct SignUpMetadata<'a> {
    pub display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    email: Option<String>,
}

impl TokenResponse {
    /// Converts the grant response into a session, relative to `now`.
    pub(super) fn into_session(self, now: DateTime<Utc>) -> AppResult<Session> {
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(timestamp), _) => DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
                AppError::Internal(format!("auth service returned invalid expires_at {timestamp}"))
            })?,
            (None, Some(seconds)) => now + Duration::seconds(seconds),
            (None, None) => {
                return Err(AppError::Internal(
                    "auth service response is missing token expiry".to_owned(),
                ));
            }
        };

        let user_id = UserId::parse(&self.user.id)
            .map_err(|error| AppError::Internal(format!("auth service returned {error}")))?;
        let identity = Identity::new(user_id, self.user.email.unwrap_or_default());

        Ok(Session::new(
            self.access_token,
            self.refresh_token,
            expires_at,
            identity,
        ))
    }
}

/// Error body variants returned by the hosted auth API.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }
}

/// Classifies a non-success auth response.
pub(super) fn auth_failure_from_response(status: u16, body: &str) -> AuthFailure {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    if status >= 500 || status == 429 {
        let message = parsed
            .message()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("auth service returned status {status}"));
        return AuthFailure::NetworkError(message);
    }

    if matches!(parsed.code(), Some("invalid_grant" | "invalid_credentials")) {
        return AuthFailure::InvalidCredentials;
    }

    AuthFailure::ServiceError(
        parsed
            .message()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("auth service returned status {status}")),
    )
}
