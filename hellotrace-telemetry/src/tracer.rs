//! Tracer and subscriber initialization.
//!
//! Sets up the OTLP exporter for distributed tracing compatible with
//! Jaeger, Grafana Tempo, or any OTLP-capable collector, and installs the
//! tracing subscriber (JSON logs + OpenTelemetry layer). Called once at
//! startup by each process; [`shutdown_telemetry`] flushes pending spans
//! on exit after in-flight requests drain.

use opentelemetry::{global, trace::TracerProvider as _, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self as sdktrace, RandomIdGenerator, Sampler},
    Resource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;
use crate::propagation::set_global_propagator;

/// Errors raised while bootstrapping telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to install OTLP trace pipeline: {0}")]
    Exporter(#[from] opentelemetry::trace::TraceError),

    #[error("failed to initialize tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Initialize the global propagator, tracer provider, and tracing
/// subscriber. Must run before any request is handled.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    set_global_propagator(config.propagation);

    let resource = Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ]);

    let sampler = if config.trace_sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if config.trace_sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(config.trace_sample_rate)
    };

    let trace_config = sdktrace::config()
        .with_sampler(sampler)
        .with_id_generator(RandomIdGenerator::default())
        .with_resource(resource);

    let tracer = if let Some(endpoint) = &config.otlp_endpoint {
        opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.as_str()),
            )
            .with_trace_config(trace_config)
            .install_batch(runtime::Tokio)
            .map(|provider| {
                let tracer = provider.tracer(config.service_name.clone());
                global::set_tracer_provider(provider);
                tracer
            })?
    } else {
        // No collector configured: spans still exist for local span
        // context propagation and logging.
        let provider = sdktrace::TracerProvider::builder()
            .with_config(trace_config)
            .build();
        let tracer = provider.tracer(config.service_name.clone());
        global::set_tracer_provider(provider);
        tracer
    };

    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_layer)
        .try_init()?;

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.environment,
        otlp_endpoint = ?config.otlp_endpoint,
        propagation = ?config.propagation,
        "Telemetry initialized"
    );

    Ok(())
}

/// Flush pending spans and tear down the tracer provider.
pub fn shutdown_telemetry() {
    global::shutdown_tracer_provider();
    tracing::info!("Tracer shutdown complete");
}
