//! HelloTrace Telemetry - Observability Infrastructure
//!
//! Shared by the edge API and the backend gRPC service:
//! - tracer/subscriber bootstrap with optional OTLP export
//! - trace-context propagation with a startup-selectable header format
//! - the span recorder facade used by the request pipelines

pub mod config;
pub mod propagation;
pub mod span;
pub mod tracer;

pub use config::TelemetryConfig;
pub use propagation::{
    extract_headers, extract_metadata, inject_metadata, set_global_propagator, B3Propagator,
    MetadataExtractor, MetadataInjector, PropagationFormat, TracePropagator,
};
pub use span::{ChildSpan, RequestSpan};
pub use tracer::{init_telemetry, shutdown_telemetry, TelemetryError};
