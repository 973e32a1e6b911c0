//! In-memory cache for upstream responses.
//!
//! Entries expire after a fixed TTL; when the cache is full the oldest entry
//! is evicted to make room.

use shared::config::CacheConfig;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Bounded TTL cache keyed by request
pub struct ResponseCache<V> {
    /// Entry lifetime
    ttl: Duration,
    /// Maximum number of entries
    max_entries: usize,
    /// Whether caching is enabled
    enabled: bool,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration, max_entries: usize, enabled: bool) -> Self {
        Self {
            ttl,
            max_entries,
            enabled: enabled && max_entries > 0,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.ttl(), config.max_entries, config.enabled)
    }

    /// Get a cached value if present and not expired
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        if !self.enabled {
            return None;
        }

        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                debug!(key = key, "Cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                debug!(key = key, "Cache entry expired");
                None
            }
            None => {
                debug!(key = key, "Cache miss");
                None
            }
        }
    }

    /// Store a value, evicting the oldest entry when full
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key.into(), value, Instant::now());
    }

    fn insert_at(&self, key: String, value: V, now: Instant) {
        if !self.enabled {
            return;
        }

        let mut entries = self.lock();
        if !entries.contains_key(&key) {
            while entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(oldest) => {
                        entries.remove(&oldest);
                        debug!(key = %oldest, "Evicted oldest cache entry");
                    }
                    None => break,
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_enabled() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10, true);
        cache.insert("test_key", 7);
        assert_eq!(cache.get("test_key"), Some(7));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_cache_disabled() {
        let cache = ResponseCache::new(Duration::from_secs(60), 10, false);
        cache.insert("test_key", 7);
        assert_eq!(cache.get("test_key"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entries_expire() {
        let cache = ResponseCache::new(Duration::from_secs(30), 10, true);
        let now = Instant::now();
        cache.insert_at("k".to_string(), "v", now);

        assert_eq!(cache.get_at("k", now + Duration::from_secs(29)), Some("v"));
        assert_eq!(cache.get_at("k", now + Duration::from_secs(30)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_entry_evicted_when_full() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2, true);
        let now = Instant::now();
        cache.insert_at("a".to_string(), 1, now);
        cache.insert_at("b".to_string(), 2, now + Duration::from_secs(1));
        cache.insert_at("c".to_string(), 3, now + Duration::from_secs(2));

        let later = now + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at("a", later), None);
        assert_eq!(cache.get_at("b", later), Some(2));
        assert_eq!(cache.get_at("c", later), Some(3));
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2, true);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }
}
