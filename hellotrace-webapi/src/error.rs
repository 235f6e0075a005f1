//! Edge error handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tonic::Status;

/// Failure while relaying a greeting upstream. The upstream status is kept
/// for logs and trace annotations but is never surfaced to HTTP callers;
/// they receive an opaque 400.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("upstream greeting call failed: {0}")]
    Upstream(#[from] Status),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "greeting request failed" })),
        )
            .into_response()
    }
}
