//! Edge HTTP API.
//!
//! Public entry point of the greeting system: accepts greeting requests
//! over HTTP, roots (or joins) the distributed trace, and relays each
//! request to the backend gRPC service with the trace context injected
//! into outbound metadata.

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod relay;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

pub use client::{GreeterApi, GrpcGreeterClient};
pub use config::WebConfig;
pub use error::RelayError;
pub use relay::AppState;

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Build the edge router. Every route runs under the tracing middleware,
/// so handlers can rely on a [`hellotrace_telemetry::RequestSpan`] being
/// present in request extensions.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/greeting", post(relay::post_greeting))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(middleware::trace_middleware))
        .with_state(state)
}
