//! A generic in-memory cache with per-key expiry (L6).
//!
//! Used by the payment worker for settlement idempotency (keyed on
//! authorization nonce) and by the pricing worker for oracle price caching,
//! including a grace window during which an expired entry can still be
//! served with a staleness flag.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_fresh(&self) -> bool {
        self.inserted_at.elapsed() < self.ttl
    }

    fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }
}

/// A sharded, read-favoured TTL cache. Cloning shares the underlying map.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    entries: std::sync::Arc<DashMap<K, Entry<V>>>,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        TtlCache {
            entries: std::sync::Arc::new(DashMap::new()),
        }
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Returns the value if present and still within its TTL.
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.value.clone())
    }

    /// Returns `(value, is_stale)` if present within `ttl + grace`, even if
    /// the TTL itself has elapsed. Used by the pricing worker so a stale
    /// oracle price can still be served for up to an hour after expiry.
    pub fn get_with_grace(&self, key: &K, grace: Duration) -> Option<(V, bool)> {
        self.entries.get(key).and_then(|entry| {
            if entry.is_fresh() {
                Some((entry.value.clone(), false))
            } else if entry.age() < entry.ttl + grace {
                Some((entry.value.clone(), true))
            } else {
                None
            }
        })
    }

    pub fn remove(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn contains_fresh(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Drops every entry past `ttl + grace`; intended to be driven by a
    /// periodic sweep task so the map doesn't grow unbounded.
    pub fn sweep(&self, grace: Duration) {
        self.entries
            .retain(|_, entry| entry.age() < entry.ttl + grace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("nonce-1", 42, Duration::from_secs(60));
        assert_eq!(cache.get(&"nonce-1"), Some(42));
    }

    #[test]
    fn expired_entry_is_not_returned_by_plain_get() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("nonce-1", 42, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"nonce-1"), None);
    }

    #[test]
    fn stale_entry_is_served_with_grace_window() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("price", 100, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        let (value, is_stale) = cache
            .get_with_grace(&"price", Duration::from_secs(3600))
            .unwrap();
        assert_eq!(value, 100);
        assert!(is_stale);
    }

    #[test]
    fn entry_beyond_grace_window_is_gone() {
        let cache: TtlCache<&str, u32> = TtlCache::new();
        cache.insert("price", 100, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get_with_grace(&"price", Duration::from_millis(0)).is_none());
    }
}
