//! Backend greeting service.
//!
//! A gRPC service that validates greeting requests, serves repeats from a
//! TTL cache, persists new greetings to PostgreSQL, and annotates every
//! step on the distributed trace it joins from request metadata.

pub mod cache;
pub mod config;
pub mod deadline;
pub mod error;
pub mod greeter;
pub mod health;
pub mod store;

pub use cache::{CacheError, InMemoryReplyCache, ReplyCache};
pub use config::{GrpcConfig, StoreConfig};
pub use error::PipelineError;
pub use greeter::GreeterService;
pub use health::HealthService;
pub use store::{GreetingRecord, GreetingStore, PgGreetingStore, RepositoryError};
