use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Response store injected into the catalog client. Keys are the exact
/// request line (`GET <url>`); values are decoded JSON bodies.
///
/// Concurrent misses for the same key may both fetch; upstream reads are
/// idempotent so no single-flight guard is kept.
#[async_trait::async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    async fn expire(&self, key: &str);
}

#[derive(Debug, Clone)]
struct CachedResponse {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// Process-local TTL store. Stale entries are dropped lazily on read.
#[derive(Debug, Default)]
pub struct InMemoryResponseCache {
    entries: tokio::sync::Mutex<HashMap<String, CachedResponse>>,
}

impl InMemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait::async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut guard = self.entries.lock().await;
        match guard.get(key) {
            Some(hit) if hit.is_fresh(Instant::now()) => Some(hit.value.clone()),
            Some(_) => {
                guard.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let entry = CachedResponse {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.entries.lock().await.insert(key.to_string(), entry);
    }

    async fn expire(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

/// Never stores anything; every lookup goes upstream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResponseCache;

#[async_trait::async_trait]
impl ResponseCache for NoopResponseCache {
    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Duration) {}

    async fn expire(&self, _key: &str) {}
}
