//! Edge configuration from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Deadline attached to every upstream greeting call.
pub const RPC_DEADLINE: Duration = Duration::from_secs(8);

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
    /// Endpoint of the backend greeting service, e.g. `http://localhost:50051`.
    pub greeter_endpoint: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            greeter_endpoint: "http://localhost:50051".to_string(),
        }
    }
}

impl WebConfig {
    /// Environment variables:
    /// - `HELLOTRACE_HTTP_BIND`: listen host (default: 0.0.0.0)
    /// - `HELLOTRACE_HTTP_PORT`: listen port (default: 8080)
    /// - `HELLOTRACE_GREETER_ENDPOINT`: backend address (default: http://localhost:50051)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HELLOTRACE_HTTP_BIND").unwrap_or(defaults.host),
            port: std::env::var("HELLOTRACE_HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            greeter_endpoint: std::env::var("HELLOTRACE_GREETER_ENDPOINT")
                .unwrap_or(defaults.greeter_endpoint),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WebConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.greeter_endpoint, "http://localhost:50051");
        assert!(config.bind_addr().is_ok());
    }
}
