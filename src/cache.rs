//! In-memory response cache.
//!
//! Entries are keyed by the normalized query (trimmed, lower-cased) and the
//! resolved mode. Expiry is lazy: an entry older than the TTL reads as
//! absent and is removed on the next access. Capacity eviction is FIFO by
//! insertion order, not LRU.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::core::Mode;

/// Normalized cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    mode: Mode,
}

impl CacheKey {
    fn new(query: &str, mode: Mode) -> Self {
        Self {
            query: query.trim().to_lowercase(),
            mode,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    text: String,
    created: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Insertion order; stale markers are skipped when their seq no longer matches.
    order: VecDeque<(CacheKey, u64)>,
    next_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Entries physically stored (may include expired ones not yet reaped).
    pub size: usize,
    /// Lookups that returned a value.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Entries removed to make room.
    pub evictions: u64,
    /// `hits / (hits + misses)`, zero before the first lookup.
    pub hit_rate: f64,
}

/// Thread-safe TTL + capacity bounded response cache.
#[derive(Debug)]
pub struct ResponseCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    capacity: usize,
}

impl ResponseCache {
    /// Creates a cache. A capacity of zero stores nothing.
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl,
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.created) > self.ttl
    }

    /// Looks up a cached result.
    pub fn get(&self, query: &str, mode: Mode) -> Option<String> {
        let key = CacheKey::new(query, mode);
        let now = Instant::now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(&key) {
            Some(entry) if !self.is_expired(entry, now) => {
                let text = entry.text.clone();
                inner.hits += 1;
                debug!(mode = %mode, "cache hit");
                return Some(text);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(&key);
            debug!(mode = %mode, "cache entry expired");
        }
        inner.misses += 1;
        None
    }

    /// Stores a result, replacing any existing entry for the same key.
    ///
    /// A replaced entry counts as a new insertion and moves to the back of
    /// the eviction order.
    pub fn put(&self, query: &str, mode: Mode, text: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        let key = CacheKey::new(query, mode);
        let now = Instant::now();
        let mut inner = self.lock();

        inner.entries.remove(&key);
        if inner.entries.len() >= self.capacity {
            let ttl = self.ttl;
            inner
                .entries
                .retain(|_, e| now.duration_since(e.created) <= ttl);
        }
        while inner.entries.len() >= self.capacity {
            let Some((oldest, seq)) = inner.order.pop_front() else {
                break;
            };
            if inner.entries.get(&oldest).is_some_and(|e| e.seq == seq) {
                inner.entries.remove(&oldest);
                inner.evictions += 1;
                debug!(mode = %oldest.mode, "cache eviction");
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((key.clone(), seq));
        inner.entries.insert(
            key,
            CacheEntry {
                text: text.into(),
                created: now,
                seq,
            },
        );

        if inner.order.len() > self.capacity.saturating_mul(2).saturating_add(16) {
            let Inner { entries, order, .. } = &mut *inner;
            order.retain(|(k, s)| entries.get(k).is_some_and(|e| e.seq == *s));
        }
    }

    /// Removes an entry. Returns `true` if one was stored.
    pub fn invalidate(&self, query: &str, mode: Mode) -> bool {
        let key = CacheKey::new(query, mode);
        self.lock().entries.remove(&key).is_some()
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    /// Returns a snapshot of the cache counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate: if total == 0 {
                0.0
            } else {
                inner.hits as f64 / total as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    fn cache(capacity: usize) -> ResponseCache {
        ResponseCache::new(Duration::from_secs(60), capacity)
    }

    #[test]
    fn test_key_normalization() {
        let cache = cache(10);
        cache.put("  Hello ", Mode::Chat, "hi there");
        assert_eq!(cache.get("hello", Mode::Chat).as_deref(), Some("hi there"));
        assert_eq!(cache.get("HELLO", Mode::Thinking), None);
    }

    #[test]
    fn test_fifo_eviction_ignores_access() {
        let cache = cache(2);
        cache.put("a", Mode::Chat, "1");
        cache.put("b", Mode::Chat, "2");
        assert!(cache.get("a", Mode::Chat).is_some());
        cache.put("c", Mode::Chat, "3");

        assert_eq!(cache.get("a", Mode::Chat), None);
        assert!(cache.get("b", Mode::Chat).is_some());
        assert!(cache.get("c", Mode::Chat).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_moves_to_back() {
        let cache = cache(2);
        cache.put("a", Mode::Chat, "1");
        cache.put("b", Mode::Chat, "2");
        cache.put("a", Mode::Chat, "1b");
        cache.put("c", Mode::Chat, "3");

        assert_eq!(cache.get("b", Mode::Chat), None);
        assert_eq!(cache.get("a", Mode::Chat).as_deref(), Some("1b"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = cache(0);
        cache.put("a", Mode::Chat, "1");
        assert_eq!(cache.get("a", Mode::Chat), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_is_lazy() {
        let cache = ResponseCache::new(Duration::from_secs(10), 10);
        cache.put("q", Mode::Chat, "r");
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(cache.get("q", Mode::Chat).is_some());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.stats().size, 1);
        assert_eq!(cache.get("q", Mode::Chat), None);
        assert_eq!(cache.stats().size, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_make_room_before_eviction() {
        let cache = ResponseCache::new(Duration::from_secs(10), 2);
        cache.put("old", Mode::Chat, "1");
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.put("b", Mode::Chat, "2");
        cache.put("c", Mode::Chat, "3");

        assert!(cache.get("b", Mode::Chat).is_some());
        assert!(cache.get("c", Mode::Chat).is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_stats_survive_clear() {
        let cache = cache(10);
        cache.put("a", Mode::Chat, "1");
        let _ = cache.get("a", Mode::Chat);
        let _ = cache.get("b", Mode::Chat);
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_invalidate() {
        let cache = cache(10);
        cache.put("a", Mode::Code, "1");
        assert!(cache.invalidate("A", Mode::Code));
        assert!(!cache.invalidate("a", Mode::Code));
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let cache = Arc::new(cache(8));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.put(&format!("{t}-{i}"), Mode::Chat, "x");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap_or_else(|_| unreachable!());
        }
        assert_eq!(cache.stats().size, 8);
    }

    proptest! {
        #[test]
        fn prop_put_then_get(query in "[a-zA-Z0-9 ]{1,40}", text in ".{0,80}") {
            let cache = cache(16);
            cache.put(&query, Mode::Search, text.clone());
            prop_assert_eq!(cache.get(&query, Mode::Search), Some(text));
        }

        #[test]
        fn prop_eviction_is_fifo(capacity in 1usize..8, extra in 1usize..8) {
            let cache = cache(capacity);
            let total = capacity + extra;
            for i in 0..total {
                cache.put(&format!("q{i}"), Mode::Chat, format!("r{i}"));
            }
            for i in 0..total {
                let present = cache.get(&format!("q{i}"), Mode::Chat).is_some();
                prop_assert_eq!(present, i >= extra);
            }
        }
    }
}
