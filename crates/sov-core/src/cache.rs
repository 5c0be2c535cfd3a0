//! Bounded, time-expiring in-process cache.
//!
//! Entries expire after a fixed TTL and the least-recently-used entry is
//! evicted once `max_entries` is reached. Nothing is persisted; losing the
//! cache only costs latency.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_used: u64,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    tick: u64,
}

/// TTL + LRU key/value store shared behind `&self`.
pub struct ResultCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    ttl: Duration,
    max_entries: usize,
}

impl<K, V> ResultCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// `max_entries` is clamped to at least 1.
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                tick: 0,
            }),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Returns a clone of the cached value, or `None` if absent or expired.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Inserts or replaces `key`, evicting the least-recently-used entry when full.
    pub fn set(&self, key: K, value: V) {
        self.set_at(key, value, Instant::now());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        let mut inner = self.lock();
        let expired = match inner.entries.get(key) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.inserted_at) >= self.ttl,
        };
        if expired {
            inner.entries.remove(key);
            return None;
        }
        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            entry.value.clone()
        })
    }

    fn set_at(&self, key: K, value: V, now: Instant) {
        let mut inner = self.lock();
        let ttl = self.ttl;
        inner
            .entries
            .retain(|_, e| now.saturating_duration_since(e.inserted_at) < ttl);

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_entries {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                inner.entries.remove(&oldest);
            }
        }

        inner.tick += 1;
        let tick = inner.tick;
        inner.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
                last_used: tick,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<K, V>> {
        // Poisoning leaves the map structurally valid.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_secs: u64, max: usize) -> ResultCache<String, Vec<u8>> {
        ResultCache::new(Duration::from_secs(ttl_secs), max)
    }

    #[test]
    fn get_after_set_returns_identical_value() {
        let c = cache(300, 10);
        c.set("k".to_string(), vec![1, 2, 3]);
        assert_eq!(c.get(&"k".to_string()), Some(vec![1, 2, 3]));
    }

    #[test]
    fn missing_key_is_absent() {
        let c = cache(300, 10);
        assert!(c.get(&"nope".to_string()).is_none());
    }

    #[test]
    fn entry_expires_after_ttl() {
        let c = cache(300, 10);
        let t0 = Instant::now();
        c.set_at("k".to_string(), vec![9], t0);
        assert!(c.get_at(&"k".to_string(), t0 + Duration::from_secs(299)).is_some());
        assert!(c.get_at(&"k".to_string(), t0 + Duration::from_secs(300)).is_none());
        assert!(c.is_empty(), "expired entry should be dropped on read");
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let c = cache(300, 2);
        let t0 = Instant::now();
        c.set_at("a".to_string(), vec![1], t0);
        c.set_at("b".to_string(), vec![2], t0);
        // Touch "a" so "b" becomes the least recently used.
        assert!(c.get_at(&"a".to_string(), t0).is_some());
        c.set_at("c".to_string(), vec![3], t0);

        assert_eq!(c.len(), 2);
        assert!(c.get_at(&"b".to_string(), t0).is_none());
        assert!(c.get_at(&"a".to_string(), t0).is_some());
        assert!(c.get_at(&"c".to_string(), t0).is_some());
    }

    #[test]
    fn overwriting_existing_key_does_not_evict() {
        let c = cache(300, 2);
        c.set("a".to_string(), vec![1]);
        c.set("b".to_string(), vec![2]);
        c.set("a".to_string(), vec![10]);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get(&"a".to_string()), Some(vec![10]));
        assert_eq!(c.get(&"b".to_string()), Some(vec![2]));
    }

    #[test]
    fn expired_entries_free_capacity_before_lru_eviction() {
        let c = cache(10, 2);
        let t0 = Instant::now();
        c.set_at("old".to_string(), vec![0], t0);
        c.set_at("fresh".to_string(), vec![1], t0 + Duration::from_secs(8));
        c.set_at("new".to_string(), vec![2], t0 + Duration::from_secs(11));
        let later = t0 + Duration::from_secs(11);
        assert!(c.get_at(&"fresh".to_string(), later).is_some());
        assert!(c.get_at(&"new".to_string(), later).is_some());
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let c = cache(300, 0);
        c.set("a".to_string(), vec![1]);
        assert_eq!(c.len(), 1);
    }
}
