//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::warn;

use crate::api::responses::ErrorResponse;

/// Errors returned by the HTTP surface.
///
/// The timer engine itself never fails; these only cover request handling.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing or invalid authorization header")]
    Unauthorized,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("Exam {0} not found")]
    ExamNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::ExamNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        ApiError::InvalidRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!("Request failed ({}): {}", status, self);
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// Convenience type alias for handler results
pub type Result<T> = std::result::Result<T, ApiError>;
