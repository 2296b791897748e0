//! Request-time failures and their HTTP responses.
//!
//! # Design Decisions
//! - Failures are local to one exchange: they become a response, never a panic
//! - Missing mock files map to 404, other file errors to 500
//! - Upstream connection failures map to 502 Bad Gateway

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Boxed error used across the upstream client seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("mock file {} is not accessible: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upstream request to {host} failed: {source}")]
    Upstream {
        host: String,
        #[source]
        source: BoxError,
    },

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::FileAccess { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            RouteError::FileAccess { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            RouteError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            RouteError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            RouteError::FileAccess { .. } => "Mock file unavailable",
            RouteError::Upstream { .. } => "Upstream request failed",
            RouteError::BadRequest(_) => "Bad request",
        };
        (status, body).into_response()
    }
}
