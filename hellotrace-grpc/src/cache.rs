//! Greeting reply cache.
//!
//! Cache-aside store mapping a raw name string to a previously computed
//! reply. Values are opaque serialized payloads; the cache performs no
//! interpretation. A `get` returning `None` is indistinguishable between
//! "never written", "expired", and "backend unreachable" -- the pipeline
//! additionally maps `Err` to a miss, so a cache outage degrades every
//! request to the write path rather than failing fast.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

/// Error raised by a cache backend. The in-memory backend never fails;
/// networked backends surface transport errors here.
#[derive(Debug, thiserror::Error)]
#[error("cache backend error: {message}")]
pub struct CacheError {
    message: String,
}

impl CacheError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Pluggable cache backend for serialized greeting replies.
///
/// Both operations are idempotent at the storage layer; concurrent `set`
/// calls for the same key resolve last-write-wins.
#[async_trait]
pub trait ReplyCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

struct CacheSlot {
    value: Vec<u8>,
    expires_at: Instant,
}

/// In-process TTL cache over a concurrent map. Long-lived, shared across
/// all concurrently handled requests. Expired entries are dropped lazily
/// on read.
#[derive(Default)]
pub struct InMemoryReplyCache {
    entries: DashMap<String, CacheSlot>,
}

impl InMemoryReplyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ReplyCache for InMemoryReplyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let expired = match self.entries.get(key) {
            Some(slot) if slot.expires_at > Instant::now() => return Ok(Some(slot.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheSlot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_returns_what_was_set() {
        let cache = InMemoryReplyCache::new();
        cache
            .set("John", b"reply".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("John").await.unwrap(), Some(b"reply".to_vec()));
    }

    #[tokio::test]
    async fn absent_key_is_none() {
        let cache = InMemoryReplyCache::new();
        assert_eq!(cache.get("nobody").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryReplyCache::new();
        cache
            .set("John", b"reply".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("John").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("John").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn concurrent_sets_resolve_last_write_wins() {
        let cache = InMemoryReplyCache::new();
        cache
            .set("John", b"first".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("John", b"second".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("John").await.unwrap(), Some(b"second".to_vec()));
        assert_eq!(cache.len(), 1);
    }
}
