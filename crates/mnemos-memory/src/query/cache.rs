//! Bounded result cache with a time-to-live.
//!
//! Entries are never swept in the background: an expired entry is only
//! noticed, and dropped, by the lookup that hits it.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use super::{QueryContext, QueryResult};

#[derive(Debug, Clone)]
struct CachedResults {
    results: Vec<QueryResult>,
    cached_at: Instant,
}

/// Thread-safe LRU of result lists keyed by query context.
pub struct QueryCache {
    lru: Mutex<LruCache<QueryContext, CachedResults>>,
    ttl: Duration,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            lru: Mutex::new(LruCache::new(cap)),
            ttl,
        }
    }

    /// Cached results for `key` if present and younger than the TTL.
    pub fn get(&self, key: &QueryContext) -> Option<Vec<QueryResult>> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &QueryContext, now: Instant) -> Option<Vec<QueryResult>> {
        let mut lru = self.lru.lock();
        let expired = match lru.get(key) {
            Some(entry) if now.saturating_duration_since(entry.cached_at) < self.ttl => {
                trace!(query = %key.query, "Query cache hit");
                return Some(entry.results.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            trace!(query = %key.query, "Query cache entry expired");
            lru.pop(key);
        }
        None
    }

    pub fn insert(&self, key: QueryContext, results: Vec<QueryResult>) {
        self.insert_at(key, results, Instant::now());
    }

    fn insert_at(&self, key: QueryContext, results: Vec<QueryResult>, now: Instant) {
        self.lru.lock().put(
            key,
            CachedResults {
                results,
                cached_at: now,
            },
        );
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut lru = self.lru.lock();
        let expired: Vec<QueryContext> = lru
            .iter()
            .filter(|(_, entry)| now.saturating_duration_since(entry.cached_at) >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            lru.pop(key);
        }
        expired.len()
    }

    pub fn clear(&self) {
        self.lru.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lru.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> QueryCache {
        QueryCache::new(2, Duration::from_secs(60))
    }

    #[test]
    fn test_hit_within_ttl() {
        let cache = cache();
        let key = QueryContext::new("rust");
        cache.insert(key.clone(), Vec::new());
        assert_eq!(cache.get(&key), Some(Vec::new()));
        assert!(cache.get(&QueryContext::new("go")).is_none());
    }

    #[test]
    fn test_expired_entry_dropped_on_lookup() {
        let cache = cache();
        let key = QueryContext::new("rust");
        let start = Instant::now();
        cache.insert_at(key.clone(), Vec::new(), start);
        assert_eq!(cache.len(), 1);
        assert!(cache.get_at(&key, start + Duration::from_secs(61)).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let cache = cache();
        let start = Instant::now();
        cache.insert_at(QueryContext::new("old"), Vec::new(), start);
        cache.insert_at(
            QueryContext::new("new"),
            Vec::new(),
            start + Duration::from_secs(30),
        );
        assert_eq!(cache.purge_expired_at(start + Duration::from_secs(70)), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_filters_are_part_of_key() {
        let cache = cache();
        cache.insert(QueryContext::new("rust").with_project("a"), Vec::new());
        assert!(cache.get(&QueryContext::new("rust")).is_none());
        assert!(cache.get(&QueryContext::new("rust").with_project("a")).is_some());
    }

    #[test]
    fn test_capacity_and_clear() {
        let cache = cache();
        for q in ["a", "b", "c"] {
            cache.insert(QueryContext::new(q), Vec::new());
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&QueryContext::new("a")).is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
