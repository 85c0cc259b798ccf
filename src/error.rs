use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error types with appropriate HTTP status codes.
///
/// # Authentication Errors
///
/// `Unauthorized` and `Forbidden` are the terminal outcomes of the
/// authentication layer. They render as bare plain-text bodies so that a
/// rejected client learns nothing beyond the status class.
///
/// # Wiring Errors
///
/// `MissingIdentity` signals that the request/response auditor ran without
/// the authenticator in front of it. It is a deployment defect, not a client
/// error, and is reported as a 500.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(
        "Request identity missing from extensions: the security event auditor must be layered inside the authenticator"
    )]
    MissingIdentity,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            // Auth rejections - plain text, no details
            AppError::Unauthorized => {
                return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
            }
            AppError::Forbidden => {
                return (StatusCode::FORBIDDEN, "Forbidden").into_response();
            }

            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.as_str()),

            // Internal errors - never expose internal details to clients
            AppError::MissingIdentity => {
                tracing::error!(error = %self, "Security pipeline misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred. Please contact support if the issue persists.",
                )
            }
            AppError::ConfigError(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_error",
                    "Service configuration error. Please contact support.",
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
