use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use techdesk_core::{AppError, AuthFailure};
use ts_rs::TS;

/// Portal error payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/portal-types/src/generated/error-response.ts"
)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP error wrapper around application and authentication failures.
#[derive(Debug)]
pub enum ApiError {
    App(AppError),
    Auth(AuthFailure),
}

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self::App(value)
    }
}

impl From<AuthFailure> for ApiError {
    fn from(value: AuthFailure) -> Self {
        Self::Auth(value)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::App(AppError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::App(AppError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::App(AppError::Conflict(_)) => StatusCode::CONFLICT,
            Self::App(AppError::Unauthorized(_)) => StatusCode::UNAUTHORIZED,
            Self::App(AppError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::App(AppError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(AuthFailure::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthFailure::NetworkError(_)) => StatusCode::BAD_GATEWAY,
            Self::Auth(AuthFailure::ServiceError(_) | AuthFailure::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    fn message(&self) -> String {
        match self {
            Self::App(error) => error.to_string(),
            Self::Auth(failure) => failure.message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            message: self.message(),
        });

        (self.status(), payload).into_response()
    }
}

/// Standard portal result type.
pub type ApiResult<T> = Result<T, ApiError>;
