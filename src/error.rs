use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    dao::storage::StorageError,
    services::{
        game_validator::GameValidationError,
        player_stats::{PartialUpdateFailure, PlayerUpdateError},
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A submitted game broke the duplicate-player or score-sum rule.
    #[error(transparent)]
    Validation(#[from] GameValidationError),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The write collided with existing data.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The game record changed but some player ledgers did not follow.
    #[error(transparent)]
    PartialUpdate(#[from] PartialUpdateFailure),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { message } => ServiceError::Conflict(message),
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<PlayerUpdateError> for ServiceError {
    fn from(err: PlayerUpdateError) -> Self {
        match err {
            PlayerUpdateError::Missing => ServiceError::NotFound("player record not found".into()),
            PlayerUpdateError::Overflow(overflow) => ServiceError::InvalidInput(overflow.to_string()),
            PlayerUpdateError::Storage(source) => source.into(),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Submitted game rejected by one or more consistency rules.
    #[error("game rejected: {message}")]
    Rejected { message: String, issues: Vec<String> },
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Games and player statistics diverged; the operation only partly applied.
    #[error("inconsistent state: {message}")]
    Inconsistent { message: String, issues: Vec<String> },
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(StorageError::Corrupt { message }) => {
                AppError::Internal(message)
            }
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Validation(rejection) => AppError::Rejected {
                message: rejection.to_string(),
                issues: rejection.issues().iter().map(ToString::to_string).collect(),
            },
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::PartialUpdate(failure) => AppError::Inconsistent {
                message: failure.to_string(),
                issues: failure
                    .failed
                    .iter()
                    .map(|update| format!("player `{}`: {}", update.player_id, update.reason))
                    .collect(),
            },
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable summary.
    pub message: String,
    /// Individual problems, e.g. each broken game rule or each failed player update.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::Rejected { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Inconsistent { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = self.to_string();
        let issues = match self {
            AppError::Rejected { issues, .. } | AppError::Inconsistent { issues, .. } => issues,
            _ => Vec::new(),
        };

        (status, Json(ErrorBody { message, issues })).into_response()
    }
}
