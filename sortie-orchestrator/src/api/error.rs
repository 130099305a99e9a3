//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::repository::RepositoryError;
use crate::service::{InventoryError, TrackerError};

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    RepositoryError(RepositoryError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::RepositoryError(err) => {
                tracing::error!("Repository error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<TrackerError> for ApiError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Validation(e) => ApiError::BadRequest(e.to_string()),
            TrackerError::NotFound(id) | TrackerError::Repository(RepositoryError::NotFound(id)) => {
                ApiError::NotFound(format!("Execution {} not found", id))
            }
            // An unknown inventory id is a bad reference inside the request
            TrackerError::Inventory(e @ InventoryError::NotFound(_)) => {
                ApiError::BadRequest(e.to_string())
            }
            TrackerError::Inventory(e) => e.into(),
            TrackerError::Repository(e) => ApiError::RepositoryError(e),
            TrackerError::Serialize(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::MissingName | InventoryError::MissingContent => {
                ApiError::BadRequest(err.to_string())
            }
            InventoryError::NotFound(id) => {
                ApiError::NotFound(format!("Inventory {} not found", id))
            }
            InventoryError::NoDefault => ApiError::NotFound("Default inventory not found".to_string()),
            InventoryError::NameTaken(_) => ApiError::Conflict(err.to_string()),
            InventoryError::Repository(e) => ApiError::RepositoryError(e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
