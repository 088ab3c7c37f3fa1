//! Central error type for the HTTP surface
//!
//! Three client-visible shapes: validation failures carry their message at
//! 400, the startup probe reports "Not ready" at 500, and anything
//! unexpected collapses to a generic 500 with details kept in the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not ready")]
    NotReady,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            AppError::NotReady => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Not ready").into_response()
            }
            AppError::RateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, "Too many requests").into_response()
            }
            AppError::Internal(details) => {
                error!(error = %details, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
