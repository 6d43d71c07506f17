//! Error responses for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use vro_generator::ResolveError;

/// Body sent with every 500. The underlying error is only logged.
pub const INTERNAL_ERROR_BODY: &str = "An unexpected error occurred while rendering the web page";

/// Body sent with every 404.
pub const NOT_FOUND_BODY: &str = "Not Found";

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Nothing matched the request path.
    #[error("not found: {0}")]
    NotFound(String),

    /// Resolution failed while reading or rendering.
    #[error("failed to resolve {path}: {source}")]
    Resolve {
        path: String,
        #[source]
        source: ResolveError,
    },

    /// The blocking render task panicked or was cancelled.
    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response(),
            err => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_BODY).into_response()
            }
        }
    }
}
