//! Greeting request pipeline.
//!
//! Validates a request, enforces the caller-supplied deadline, attempts a
//! cache read, falls back to persistence plus cache population, and
//! returns a reply or a structured failure. Every step is annotated on
//! the request's trace: the server span is opened as a child of whatever
//! context the caller injected into request metadata, so the edge span
//! and this one share a single logical trace.

use std::sync::Arc;
use std::time::Duration;

use prost::Message;
use tokio::time::Instant;
use tonic::{Request, Response, Status};

use hellotrace_proto::greeter::{
    greeter_server::Greeter, HelloReply, HelloRequest,
};
use hellotrace_telemetry::{extract_metadata, RequestSpan};

use crate::cache::ReplyCache;
use crate::deadline::deadline_from_metadata;
use crate::error::{PipelineError, NAME_IS_MUD, NAME_REQUIRED};
use crate::store::{GreetingRecord, GreetingStore};

/// How long a computed reply stays valid in the cache.
pub const REPLY_CACHE_TTL: Duration = Duration::from_secs(60);

/// The backend greeting service. Store and cache handles are long-lived
/// and shared across all concurrently handled requests.
pub struct GreeterService {
    store: Arc<dyn GreetingStore>,
    cache: Arc<dyn ReplyCache>,
    cache_ttl: Duration,
}

impl GreeterService {
    pub fn new(store: Arc<dyn GreetingStore>, cache: Arc<dyn ReplyCache>) -> Self {
        Self {
            store,
            cache,
            cache_ttl: REPLY_CACHE_TTL,
        }
    }

    /// Run one request through the pipeline.
    ///
    /// Validation order is fixed; the first failing check wins:
    /// no deadline, then empty name, then the reserved name.
    async fn handle(
        &self,
        request: &HelloRequest,
        deadline: Option<Instant>,
        span: &RequestSpan,
    ) -> Result<HelloReply, PipelineError> {
        let deadline = deadline.ok_or(PipelineError::MissingDeadline)?;

        let name = request.name.as_str();
        if name.trim().is_empty() {
            return Err(PipelineError::InvalidArgument(NAME_REQUIRED));
        }
        if name.eq_ignore_ascii_case("Mud") {
            return Err(PipelineError::InvalidArgument(NAME_IS_MUD));
        }

        // Cache-aside read. An unreadable entry or a failing backend is
        // treated as a miss: a cache outage degrades every request to the
        // write path instead of failing fast.
        let cached = {
            let cache_span = span.child("Check-Cache");
            cache_span.tag("cache.searchKey", name.to_string());
            let hit = match self.cache.get(name).await {
                Ok(Some(bytes)) => match HelloReply::decode(bytes.as_slice()) {
                    Ok(reply) => Some(reply),
                    Err(err) => {
                        tracing::warn!(key = %name, error = %err, "Cached reply failed to decode; treating as miss");
                        None
                    }
                },
                Ok(None) => None,
                Err(err) => {
                    tracing::warn!(key = %name, error = %err, "Cache read failed; treating as miss");
                    None
                }
            };
            cache_span.tag("cache.result", if hit.is_some() { "hit" } else { "miss" });
            cache_span.end();
            hit
        };

        if let Some(reply) = cached {
            return Ok(reply);
        }

        // Miss: persist a new record within the remaining deadline budget.
        let mut record = GreetingRecord::new(name);
        {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PipelineError::DeadlineExpired("insert_greeting"));
            }

            let insert_span = span.child("Insert-Sql-Record");
            let id = match tokio::time::timeout(remaining, self.store.insert_greeting(&record)).await
            {
                Ok(result) => result?,
                Err(_) => return Err(PipelineError::DeadlineExpired("insert_greeting")),
            };
            record.id = id;
            insert_span.tag("record.id", id);
            tracing::info!(
                record.id = id,
                record.name = %record.name,
                record.utc = %record.utc,
                "Inserted new greeting record"
            );
            insert_span.end();
        }

        let reply = HelloReply {
            message: format!(
                "{} said hello at {} UTC.",
                record.name,
                record.utc.format("%H:%M:%S%.3f")
            ),
        };

        // Populate the cache. A record persisted but not yet cached is an
        // accepted inconsistency window; the write is not transactional
        // with the insert.
        let cache_span = span.child("Add-To-Cache");
        if let Err(err) = self
            .cache
            .set(name, reply.encode_to_vec(), self.cache_ttl)
            .await
        {
            tracing::warn!(key = %name, error = %err, "Cache write failed");
        }
        cache_span.end();

        Ok(reply)
    }
}

#[tonic::async_trait]
impl Greeter for GreeterService {
    async fn say_hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloReply>, Status> {
        let parent = extract_metadata(request.metadata());
        let span = RequestSpan::server("SayHello", &parent);
        let deadline = deadline_from_metadata(request.metadata());
        let peer = request.remote_addr();
        let request = request.into_inner();

        match self.handle(&request, deadline, &span).await {
            Ok(reply) => {
                span.set_ok();
                span.end();
                Ok(Response::new(reply))
            }
            Err(err) => {
                let status = err.to_status();

                // Exactly one failure event on the active span per non-OK
                // outcome.
                span.event(format!("{:?}: {}", status.code(), status.message()));
                span.set_error(status.message().to_string());

                match &err {
                    PipelineError::MissingDeadline => {
                        tracing::warn!(peer = ?peer, "Caller omitted deadline");
                    }
                    PipelineError::InvalidArgument(_) => {
                        // Full payload is diagnostic value here; the name
                        // is the whole request.
                        tracing::warn!(request.name = %request.name, "Input validation failed");
                    }
                    PipelineError::DeadlineExpired(operation) => {
                        tracing::warn!(operation, "Deadline expired before completion");
                    }
                    PipelineError::Repository(repo) => {
                        tracing::error!(error = %repo, "Repository failure");
                    }
                }

                span.end();
                Err(status)
            }
        }
    }
}
