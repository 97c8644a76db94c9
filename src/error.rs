use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::SuggestResponse;

// Failures that surface as an HTTP error status
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed request body: {0}")]
    MalformedRequest(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedRequest(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        (status, Json(SuggestResponse::no_match(self.to_string()))).into_response()
    }
}
