use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use taglink_core::error::{AuthError, Error};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Storage configuration is missing")]
    ConfigurationMissing,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many failed login attempts, try again later")]
    RateLimited,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Auth(AuthError::InvalidCredentials) => ApiError::InvalidCredentials,
            Error::Auth(AuthError::UserNotFound) => {
                ApiError::NotFound("User not found".to_string())
            }
            Error::Auth(AuthError::UserAlreadyExists) => {
                ApiError::Conflict("Email already registered".to_string())
            }
            Error::Auth(AuthError::SecondFactorNotFound) => {
                ApiError::NotFound("Second factor not configured".to_string())
            }
            Error::Auth(AuthError::InvalidOneTimeCode) => {
                ApiError::Unauthorized("Invalid one-time code".to_string())
            }
            Error::Auth(AuthError::InvalidRecoveryCode) => {
                ApiError::Unauthorized("Invalid recovery code".to_string())
            }
            Error::Auth(AuthError::InvalidMagicToken) => {
                ApiError::Unauthorized("Invalid or expired token".to_string())
            }
            Error::Validation(e) => ApiError::BadRequest(e.to_string()),
            // Storage failures and internal auth machinery errors are logged,
            // never echoed to the caller.
            other => {
                tracing::error!(error = %other, "Request failed");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::ConfigurationMissing => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.to_string() }),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": self.to_string() }),
            ),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": self.to_string(), "rateLimited": true }),
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
            ApiError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": self.to_string() }),
            ),
            ApiError::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": self.to_string() }),
            ),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, json!({ "error": self.to_string() })),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
