//! Error types and handling
//!
//! All handler errors are converted to the API's JSON error shape:
//! `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Bad request - invalid input (400)
    #[error("{0}")]
    BadRequest(String),

    /// Unauthorized - authentication required (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Forbidden - insufficient permissions (403)
    #[error("{0}")]
    Forbidden(String),

    /// Conflict - overlap or duplicate (400, see below)
    #[error("{0}")]
    Conflict(String),

    /// Validation failed (400, field-specific message)
    #[error("{0}")]
    Validation(String),

    /// Database error (500)
    #[error("database error: {0}")]
    Database(String),

    /// Internal server error (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Conflicts (booking overlap, duplicate phone/slug/username) are 400
        // on this API, not 409.
        let (status, should_log) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, false),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, false),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, false),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, true),
            AppError::Conflict(_) => (StatusCode::BAD_REQUEST, false),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, false),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, true),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, true),
        };

        if should_log {
            error!(error = %self, "Request error");
        }

        // Server-side failures get a generic message; details stay in the log.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.message().contains("UNIQUE constraint failed") {
                    AppError::Conflict("resource already exists".to_string())
                } else {
                    AppError::Database(db_err.to_string())
                }
            }
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        // Surface the first field error as "<field>: <message>" so the client
        // can show a field-specific message.
        let message = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    let detail = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    format!("{}: {}", field, detail)
                })
            })
            .next()
            .unwrap_or_else(|| "validation failed".to_string());
        AppError::Validation(message)
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
