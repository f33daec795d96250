use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Error response type
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// This is the single place where failures become HTTP status codes.
/// Internal errors are logged in full and reported to the caller with a
/// generic message only.
#[derive(Debug)]
pub enum ApiError {
    /// Request body or query string does not match the schema
    Validation(String),
    /// Path id is not a key this datastore could have issued
    InvalidCatId,
    /// Cursor is not a token this datastore could have issued
    InvalidCursor,
    CatNotFound,
    /// Anything else, typically a datastore failure
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::InvalidCatId => (StatusCode::BAD_REQUEST, "Invalid Cat ID".to_string()),
            ApiError::InvalidCursor => (StatusCode::BAD_REQUEST, "Invalid cursor".to_string()),
            ApiError::CatNotFound => (StatusCode::NOT_FOUND, "Cat not found".to_string()),
            ApiError::Internal(err) => {
                tracing::error!("Unhandled error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(e) => {
                tracing::info!("Rejected cat id: {}", e);
                ApiError::InvalidCatId
            }
            StorageError::InvalidCursor(e) => {
                tracing::info!("Rejected cursor: {}", e);
                ApiError::InvalidCursor
            }
            StorageError::Backend(e) => ApiError::Internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
