use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Domain errors raised by the data-access layer and translated to HTTP at
/// the handler boundary. Store-specific error codes never leak past here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DuplicateEmail(String),

    #[error("{0}")]
    NotFound(String),

    #[error("database connection failed")]
    Connection(#[source] sqlx::Error),

    #[error("database query failed")]
    Query(#[source] sqlx::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateEmail(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Connection(_) | AppError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db) = e.as_database_error() {
            if db.is_unique_violation() {
                return AppError::DuplicateEmail("Email already exists".into());
            }
        }
        AppError::Query(e)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Store failures carry their detail in a separate field; domain
        // errors are the message itself.
        let (message, detail) = match &self {
            AppError::Validation(msg)
            | AppError::DuplicateEmail(msg)
            | AppError::NotFound(msg) => (msg.clone(), None),
            AppError::Connection(e) | AppError::Query(e) => {
                (self.to_string(), Some(e.to_string()))
            }
        };

        if status.is_server_error() {
            error!(error = ?self, "request failed");
        } else {
            warn!(%status, %message, "request rejected");
        }

        let body = ErrorBody {
            success: false,
            message,
            error: detail,
        };
        (status, Json(body)).into_response()
    }
}
