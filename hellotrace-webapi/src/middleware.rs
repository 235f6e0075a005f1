//! HTTP request tracing middleware.
//!
//! Wraps every request in a server span. The span joins the trace carried
//! by inbound headers when one is present, otherwise it roots a new trace.
//! Handlers receive the span through request extensions and annotate it
//! directly rather than reaching for ambient thread-local state.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

use hellotrace_telemetry::{extract_headers, RequestSpan};

pub async fn trace_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let parent = extract_headers(request.headers());
    let span = RequestSpan::server(format!("{} {}", method, path), &parent);
    span.tag("http.method", method.to_string());
    span.tag("http.target", path.clone());

    let mut request = request;
    request.extensions_mut().insert(span.clone());

    let response = next.run(request).await;

    let status = response.status();
    span.tag("http.status_code", status.as_u16() as i64);
    if status.is_client_error() || status.is_server_error() {
        span.set_error(status.to_string());
    } else {
        span.set_ok();
    }
    span.end();

    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
