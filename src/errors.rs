use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Required settings are missing (raised before any network call).
    Configuration(String),
    /// Bad request error (invalid input record).
    BadRequest(String),
    /// Error interacting with the Affinity API.
    ExternalApiError(String),
    /// Internal server error.
    InternalError(String),
}

impl AppError {
    /// The message handed back to the caller in `{success: false, error}`.
    ///
    /// Unlike `Display`, this carries no category prefix so the remote
    /// service's own wording reaches the user unchanged.
    pub fn caller_message(&self) -> &str {
        match self {
            AppError::Configuration(msg)
            | AppError::BadRequest(msg)
            | AppError::ExternalApiError(msg)
            | AppError::InternalError(msg) => msg,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Maps each error variant to an appropriate HTTP status code and JSON body.
    /// Logs errors appropriately based on their severity.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::Configuration(msg) => {
                tracing::warn!("Configuration error: {}", msg);
                (StatusCode::PRECONDITION_FAILED, msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
