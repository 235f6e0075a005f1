//! Telemetry configuration from environment variables.

use crate::propagation::PropagationFormat;

/// Telemetry configuration shared by the edge and the backend.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// OTLP endpoint for traces (e.g., "http://localhost:4317"). When
    /// unset, spans are created locally but not exported.
    pub otlp_endpoint: Option<String>,
    /// Service name attached to exported spans.
    pub service_name: String,
    /// Service version.
    pub service_version: String,
    /// Environment (production, staging, development).
    pub environment: String,
    /// Trace sampling rate (0.0 to 1.0).
    pub trace_sample_rate: f64,
    /// Header format used to carry trace identifiers across the RPC hop.
    /// Must match between the two processes.
    pub propagation: PropagationFormat,
}

impl TelemetryConfig {
    /// Defaults for the given service: sample everything, export nowhere,
    /// W3C propagation.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            otlp_endpoint: None,
            service_name: service_name.into(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            trace_sample_rate: 1.0,
            propagation: PropagationFormat::default(),
        }
    }

    /// Load telemetry configuration from the environment.
    ///
    /// Environment variables:
    /// - `HELLOTRACE_OTLP_ENDPOINT`: OTLP collector endpoint (unset = no export)
    /// - `HELLOTRACE_SERVICE_NAME`: override the service name
    /// - `HELLOTRACE_SERVICE_VERSION`: override the service version
    /// - `HELLOTRACE_ENVIRONMENT`: deployment environment (default: development)
    /// - `HELLOTRACE_TRACE_SAMPLE_RATE`: 0.0..=1.0 (default: 1.0)
    /// - `HELLOTRACE_TRACE_FORMAT`: "w3c" (default), "b3m", or "b3s"
    pub fn from_env(default_service_name: &str) -> Self {
        let defaults = Self::new(default_service_name);
        Self {
            otlp_endpoint: std::env::var("HELLOTRACE_OTLP_ENDPOINT").ok(),
            service_name: std::env::var("HELLOTRACE_SERVICE_NAME")
                .unwrap_or(defaults.service_name),
            service_version: std::env::var("HELLOTRACE_SERVICE_VERSION")
                .unwrap_or(defaults.service_version),
            environment: std::env::var("HELLOTRACE_ENVIRONMENT")
                .unwrap_or(defaults.environment),
            trace_sample_rate: std::env::var("HELLOTRACE_TRACE_SAMPLE_RATE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.trace_sample_rate),
            propagation: std::env::var("HELLOTRACE_TRACE_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.propagation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local_only_w3c() {
        let config = TelemetryConfig::new("hellotrace-grpc");
        assert_eq!(config.service_name, "hellotrace-grpc");
        assert!(config.otlp_endpoint.is_none());
        assert_eq!(config.trace_sample_rate, 1.0);
        assert_eq!(config.propagation, PropagationFormat::W3c);
    }
}
