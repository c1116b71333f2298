use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use service::auth::errors::AuthError;
use thiserror::Error;
use tracing::error;

/// Error response with the uniform body
/// `{statusCode, message, error, timestamp, path}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub path: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, path: &str) -> Self {
        Self { status, message: message.into(), path: path.to_string() }
    }

    pub fn bad_request(message: impl Into<String>, path: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, path)
    }

    /// Map a service error. Internal failures are logged here and reach the
    /// client only as a generic 500.
    pub fn from_auth(err: &AuthError, path: &str) -> Self {
        let status = match err {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::HashError(_) | AuthError::TokenError(_) | AuthError::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if err.is_internal() {
            error!(code = err.code(), error = %err, %path, "request failed");
            return Self::new(status, "Internal server error", path);
        }
        Self::new(status, err.to_string(), path)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "statusCode": self.status.as_u16(),
            "message": self.message,
            "error": self.status.canonical_reason().unwrap_or("Error"),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "path": self.path,
        });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("backend unavailable: {0}")]
    Backend(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::from_auth(&AuthError::AlreadyExists, "/").status, StatusCode::CONFLICT);
        assert_eq!(ApiError::from_auth(&AuthError::InvalidCredentials, "/").status, StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::from_auth(&AuthError::Validation("x".into()), "/").status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::from_auth(&AuthError::Infrastructure("redis at 10.0.0.5 refused".into()), "/auth/login");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");
        assert_eq!(err.path, "/auth/login");
    }
}
