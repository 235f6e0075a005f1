//! Backend configuration from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use crate::store::RepositoryError;

/// Listener configuration for the gRPC service.
#[derive(Debug, Clone)]
pub struct GrpcConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
        }
    }
}

impl GrpcConfig {
    /// Environment variables:
    /// - `HELLOTRACE_GRPC_BIND`: listen host (default: 0.0.0.0)
    /// - `HELLOTRACE_GRPC_PORT`: listen port (default: 50051)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HELLOTRACE_GRPC_BIND").unwrap_or(defaults.host),
            port: std::env::var("HELLOTRACE_GRPC_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Connection pool configuration for the greeting store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_size: usize,
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "hellotrace".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl StoreConfig {
    /// Environment variables:
    /// - `HELLOTRACE_DB_HOST` (default: localhost)
    /// - `HELLOTRACE_DB_PORT` (default: 5432)
    /// - `HELLOTRACE_DB_NAME` (default: hellotrace)
    /// - `HELLOTRACE_DB_USER` (default: postgres)
    /// - `HELLOTRACE_DB_PASSWORD` (default: empty)
    /// - `HELLOTRACE_DB_POOL_SIZE` (default: 16)
    /// - `HELLOTRACE_DB_TIMEOUT` seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HELLOTRACE_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("HELLOTRACE_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("HELLOTRACE_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("HELLOTRACE_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("HELLOTRACE_DB_PASSWORD").unwrap_or(defaults.password),
            max_size: std::env::var("HELLOTRACE_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: Duration::from_secs(
                std::env::var("HELLOTRACE_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool. Connections are established lazily and
    /// recycled (reopened if broken) before each use.
    pub fn create_pool(&self) -> Result<Pool, RepositoryError> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_config.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_config);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| RepositoryError::new("create_pool", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grpc_config() {
        let config = GrpcConfig::default();
        assert_eq!(config.port, 50051);
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn default_store_config() {
        let config = StoreConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "hellotrace");
        assert_eq!(config.max_size, 16);
    }
}
