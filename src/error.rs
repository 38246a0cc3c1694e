use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// Authenticated but not the owner of the resource.
    #[error("Not authorized")]
    Forbidden,

    /// No record for the requested id.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// A database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other unexpected failure.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Not authorized".to_string()),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(ref e) => {
                tracing::error!(error = %e, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            AppError::Internal(ref e) => {
                tracing::error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
