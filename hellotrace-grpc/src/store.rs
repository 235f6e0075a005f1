//! Greeting store.
//!
//! Append-only persistence for greeting records. One row per greeting with
//! an auto-assigned integer identity, a bounded name column, and a UTC
//! timestamp. Connection lifecycle is owned by the deadpool pool, which
//! recycles broken connections before handing one out, so the pipeline
//! never manages connections itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;

use crate::config::StoreConfig;

/// Table layout expected by [`PgGreetingStore`]. Applied at startup when
/// reachable; schema migration beyond this is out of scope.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS greetings (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(50) NOT NULL,
    utc TIMESTAMPTZ NOT NULL
)";

const INSERT_GREETING: &str = "INSERT INTO greetings (name, utc) VALUES ($1, $2) RETURNING id";

/// One greeting, owned by the pipeline for the duration of a single
/// request. `id` is zero until the store assigns it; it is assigned
/// exactly once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GreetingRecord {
    pub id: i64,
    pub name: String,
    pub utc: DateTime<Utc>,
}

impl GreetingRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            utc: Utc::now(),
        }
    }
}

/// A storage or transport failure, wrapping the failed operation's name
/// and the underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("repository operation `{operation}` failed")]
pub struct RepositoryError {
    pub operation: &'static str,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl RepositoryError {
    pub fn new(
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Persistence seam for greeting records. No update or delete operations
/// exist; the store is append-only from the pipeline's perspective.
#[async_trait]
pub trait GreetingStore: Send + Sync {
    /// Persist a record and return the identity the store assigned to it.
    async fn insert_greeting(&self, record: &GreetingRecord) -> Result<i64, RepositoryError>;
}

/// PostgreSQL-backed greeting store over a shared connection pool.
pub struct PgGreetingStore {
    pool: Pool,
}

impl PgGreetingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, RepositoryError> {
        Ok(Self::new(config.create_pool()?))
    }

    /// Create the greetings table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| RepositoryError::new("ensure_schema", e))?;
        conn.execute(SCHEMA, &[])
            .await
            .map_err(|e| RepositoryError::new("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl GreetingStore for PgGreetingStore {
    async fn insert_greeting(&self, record: &GreetingRecord) -> Result<i64, RepositoryError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| RepositoryError::new("insert_greeting", e))?;
        let row = conn
            .query_one(INSERT_GREETING, &[&record.name, &record.utc])
            .await
            .map_err(|e| RepositoryError::new("insert_greeting", e))?;
        Ok(row.get(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_no_identity_yet() {
        let record = GreetingRecord::new("John");
        assert_eq!(record.id, 0);
        assert_eq!(record.name, "John");
    }

    #[test]
    fn repository_error_names_the_operation() {
        let err = RepositoryError::new(
            "insert_greeting",
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection reset"),
        );
        assert_eq!(err.to_string(), "repository operation `insert_greeting` failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
