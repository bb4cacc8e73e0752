//! CineSync API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cinesync_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

/// The HTTP status reported for a domain failure.
#[must_use]
pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::RoomNotFound(_)
        | DomainError::UserNotFound(_)
        | DomainError::ViewerNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::UserBannedInRoom(_)
        | DomainError::ActionNotAllowed(_)
        | DomainError::InvalidCode => StatusCode::FORBIDDEN,
        DomainError::RoomIsFull { .. }
        | DomainError::UserAlreadyInRoom(_)
        | DomainError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::RoomBusy(_) | DomainError::MediaNotAvailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        DomainError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            error: self.0.code(),
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
