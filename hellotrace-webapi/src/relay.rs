//! Greeting relay endpoint.
//!
//! `POST /api/greeting` forwards the caller's name to the backend greeting
//! service and returns its reply. One guard runs before the upstream call:
//! the placeholder name "string" (the value interactive API explorers
//! pre-fill) is answered locally with a canned refusal, leaving a trace
//! that visibly stops at the edge.

use std::sync::Arc;

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;

use hellotrace_telemetry::RequestSpan;

use crate::client::GreeterApi;
use crate::error::RelayError;

pub const TRICK_REPLY: &str =
    "You're trying to trick me into giving something away...  It won't work!";

#[derive(Debug, Clone, Deserialize)]
pub struct GreetingIn {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GreetingOut {
    pub message: String,
}

/// Shared edge state. The greeter handle is a seam so the handler can be
/// exercised without a live backend.
#[derive(Clone)]
pub struct AppState {
    pub greeter: Arc<dyn GreeterApi>,
}

pub async fn post_greeting(
    State(state): State<AppState>,
    Extension(span): Extension<RequestSpan>,
    Json(input): Json<GreetingIn>,
) -> Result<Json<GreetingOut>, RelayError> {
    tracing::trace!(name = %input.name, "Request input");

    if input.name == "string" {
        tracing::warn!("Tricksy hackerses, we hates them!");
        span.tag("illegal.input", input.name);
        return Ok(Json(GreetingOut {
            message: TRICK_REPLY.to_string(),
        }));
    }

    // Child span capturing the request/reply pair of the upstream call.
    let call_span = span.client_child("Call-Grpc-Service");
    call_span.tag("rpc.request", json!({ "name": input.name }).to_string());

    match state.greeter.say_hello(&input.name, call_span.context()).await {
        Ok(message) => {
            tracing::debug!(reply = %message, "Service replied");
            call_span.tag("rpc.reply", json!({ "message": message }).to_string());
            call_span.end();
            Ok(Json(GreetingOut { message }))
        }
        Err(status) => {
            call_span.tag("error.status", format!("{:?}", status.code()));
            call_span.event(status.message().to_string());
            call_span.end();
            Err(RelayError::Upstream(status))
        }
    }
}
