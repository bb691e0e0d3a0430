//! Error types for the import pipeline and the HTTP layer.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Failure of a FIT import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read FIT file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode FIT file: {0}")]
    Decode(String),

    #[error("FIT file does not contain session data")]
    MissingSession,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ImportError {
    /// True when the file itself is at fault rather than the server.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::MissingSession)
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Import(#[from] ImportError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::Import(ImportError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Import(err) if err.is_invalid_input() => StatusCode::BAD_REQUEST,
            AppError::Import(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, details) = match &self {
            AppError::Unauthorized => ("unauthorized", None),
            AppError::BadRequest(msg) => ("bad_request", Some(msg.clone())),
            AppError::NotFound(msg) | AppError::Import(ImportError::NotFound(msg)) => {
                ("not_found", Some(msg.clone()))
            }
            AppError::Import(err) if err.is_invalid_input() => {
                ("invalid_fit_file", Some(err.to_string()))
            }
            AppError::Import(err) => {
                tracing::error!(error = %err, "FIT import failed");
                (
                    "import_failed",
                    Some(format!("Failed to process FIT file: {err}")),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
