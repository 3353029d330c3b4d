//! Error types for the query service.
//!
//! [`ServiceError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//!
//! Every failure is reported as `500 Internal Server Error` with the
//! error text as a plain-text body. Clients distinguish request and
//! storage failures by the message prefix.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geomark_db::DbError;

/// Errors that can occur in the query service layer.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request payload or parameters were malformed.
    #[error("bad request: {0}")]
    Request(String),

    /// The marker store rejected the operation.
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match &self {
            Self::Request(_) => tracing::debug!(error = %message, "Rejected request"),
            Self::Storage(_) => tracing::warn!(error = %message, "Store operation failed"),
        }
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}
