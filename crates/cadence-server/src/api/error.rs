//! API error responses
//!
//! Every failure is a JSON body `{"error": "<Code>"}` with a matching status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use cadence_core::{ReviewError, StorageError};
use tracing::error;

/// Error returned by API handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// 400: rating outside 1..=4 or not an integer
    InvalidQuality,
    /// 400: malformed body or missing fields
    InvalidRequest(String),
    /// 403: no owner identity on the request
    Forbidden,
    /// 404: card missing or owned by someone else
    NotFound,
    /// 409: concurrent update, or client review id reused for another card
    Conflict,
    /// 500: persistence failure (details are logged, never returned)
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuality | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidQuality => "InvalidQuality",
            ApiError::InvalidRequest(_) => "InvalidRequest",
            ApiError::Forbidden => "Forbidden",
            ApiError::NotFound => "NotFound",
            ApiError::Conflict => "Conflict",
            ApiError::Internal => "Internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::InvalidRequest(message) => serde_json::json!({
                "error": self.code(),
                "message": message,
            }),
            _ => serde_json::json!({ "error": self.code() }),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => ApiError::NotFound,
            StorageError::Conflict(_) | StorageError::ClientIdReused { .. } => ApiError::Conflict,
            StorageError::InvalidInput(message) => ApiError::InvalidRequest(message),
            other => {
                error!("Storage failure: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::InvalidQuality(_) => ApiError::InvalidQuality,
            ReviewError::NotFound(_) => ApiError::NotFound,
            ReviewError::Forbidden => ApiError::Forbidden,
            ReviewError::Conflict(_) | ReviewError::ClientIdReused { .. } => ApiError::Conflict,
            ReviewError::Storage(e) => e.into(),
            other => {
                error!("Review failure: {}", other);
                ApiError::Internal
            }
        }
    }
}
