//! Memoizing table cache
//!
//! Loaded tables are keyed by (source identity, query text). Entries live
//! until invalidated, or until older than the TTL when one is configured.
//! Loads run outside the lock; two concurrent misses for the same key may
//! both load, and the later insert wins.

use bnbi_common::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::source::SourceId;

/// Cache key: which source, which query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: SourceId,
    pub query: String,
}

impl CacheKey {
    pub fn new(source: SourceId, query: impl Into<String>) -> Self {
        Self {
            source,
            query: query.into(),
        }
    }
}

struct Entry<T> {
    value: Arc<T>,
    loaded_at: Instant,
}

pub struct TableCache<T> {
    entries: RwLock<HashMap<CacheKey, Entry<T>>>,
    ttl: Option<Duration>,
}

impl<T> TableCache<T> {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_fresh(&self, entry: &Entry<T>) -> bool {
        self.ttl.map_or(true, |ttl| entry.loaded_at.elapsed() < ttl)
    }

    /// Cached value for `key`, loading it with `load` on a miss or expiry
    ///
    /// A failed load caches nothing.
    pub async fn get_or_load<F, Fut>(&self, key: &CacheKey, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(key) {
                if self.is_fresh(entry) {
                    return Ok(Arc::clone(&entry.value));
                }
                debug!("Cache entry expired: {} / {}", key.source, key.query);
            }
        }

        let value = Arc::new(load().await?);
        self.entries.write().await.insert(
            key.clone(),
            Entry {
                value: Arc::clone(&value),
                loaded_at: Instant::now(),
            },
        );
        debug!("Cached: {} / {}", key.source, key.query);
        Ok(value)
    }

    /// Drop every entry; returns how many were dropped
    pub async fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use bnbi_common::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(location: &str) -> CacheKey {
        CacheKey::new(SourceId::new(Backend::Document, location), "find({})")
    }

    #[tokio::test]
    async fn test_memoizes_until_invalidated() {
        let cache: TableCache<usize> = TableCache::new(None);
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) };

        assert_eq!(*cache.get_or_load(&key("a"), load).await.unwrap(), 1);
        assert_eq!(*cache.get_or_load(&key("a"), load).await.unwrap(), 1);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        assert_eq!(cache.invalidate_all().await, 1);
        assert_eq!(*cache.get_or_load(&key("a"), load).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache: TableCache<&'static str> = TableCache::new(None);
        cache.get_or_load(&key("a"), || async { Ok("a") }).await.unwrap();
        cache.get_or_load(&key("b"), || async { Ok("b") }).await.unwrap();
        assert_eq!(cache.len().await, 2);
        assert_eq!(*cache.get_or_load(&key("b"), || async { Ok("other") }).await.unwrap(), "b");

        assert_eq!(cache.invalidate_all().await, 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_reloads() {
        let cache: TableCache<usize> = TableCache::new(Some(Duration::ZERO));
        let loads = AtomicUsize::new(0);
        let counter = &loads;
        let load = move || async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) };

        cache.get_or_load(&key("a"), load).await.unwrap();
        cache.get_or_load(&key("a"), load).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache: TableCache<usize> = TableCache::new(None);
        let err = cache
            .get_or_load(&key("a"), || async { Err(Error::Source("down".into())) })
            .await;
        assert!(err.is_err());
        assert_eq!(cache.len().await, 0);
    }
}
