//! Bounded key/value store with per-entry TTL and least-recent-use eviction.
//!
//! Expiry is lazy: entries are checked and removed on access, there is no
//! background sweep. The store is not synchronized; the router wraps it in a
//! mutex.

use crate::clock::Clock;
use std::collections::BTreeMap;
use std::sync::Arc;

struct Entry<V> {
    value: V,
    expires_at_ms: u64,
    last_used: u64,
}

pub struct TtlCache<V> {
    max_entries: usize,
    // Monotonic access counter; higher = more recently used.
    tick: u64,
    entries: BTreeMap<String, Entry<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_entries: max_entries.max(1),
            tick: 0,
            entries: BTreeMap::new(),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// An entry whose expiry is at or before now is absent (and removed).
    /// A hit marks the entry most-recently-used.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let expired = match self.entries.get(key) {
            Some(e) => e.expires_at_ms <= now,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.tick += 1;
        let tick = self.tick;
        let e = self.entries.get_mut(key)?;
        e.last_used = tick;
        Some(e.value.clone())
    }

    /// Overwrites any existing entry; expiry = now + max(1, ttl_s) seconds.
    pub fn set(&mut self, key: &str, value: V, ttl_s: u64) {
        let now = self.clock.now_ms();
        self.tick += 1;
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at_ms: now.saturating_add(ttl_s.max(1).saturating_mul(1_000)),
                last_used: self.tick,
            },
        );
        // Evict least-recently-used entries one at a time. O(n) scan; the
        // store is small and bounded.
        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    self.entries.remove(&k);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache(max_entries: usize) -> (TtlCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (TtlCache::new(max_entries, clock.clone()), clock)
    }

    #[test]
    fn set_then_get_returns_the_value() {
        let (mut c, _clock) = cache(4);
        c.set("k", "v".to_string(), 60);
        assert_eq!(c.get("k"), Some("v".to_string()));
    }

    #[test]
    fn expired_entries_are_absent_and_removed() {
        let (mut c, clock) = cache(4);
        c.set("k", "v".to_string(), 60);
        clock.advance_ms(60_000);
        assert_eq!(c.get("k"), None);
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn set_refreshes_an_existing_entry() {
        let (mut c, clock) = cache(4);
        c.set("k", "old".to_string(), 10);
        clock.advance_ms(9_000);
        c.set("k", "new".to_string(), 10);
        clock.advance_ms(5_000);
        assert_eq!(c.get("k"), Some("new".to_string()));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn zero_ttl_is_treated_as_one_second() {
        let (mut c, clock) = cache(4);
        c.set("k", "v".to_string(), 0);
        clock.advance_ms(999);
        assert_eq!(c.get("k"), Some("v".to_string()));
        clock.advance_ms(1);
        assert_eq!(c.get("k"), None);
    }

    #[test]
    fn eviction_removes_the_least_recently_used_entry() {
        let (mut c, _clock) = cache(2);
        c.set("a", "1".to_string(), 60);
        c.set("b", "2".to_string(), 60);
        // Touch `a` so `b` becomes the eviction candidate.
        assert!(c.get("a").is_some());
        c.set("c", "3".to_string(), 60);
        assert_eq!(c.len(), 2);
        assert!(c.get("a").is_some());
        assert!(c.get("b").is_none());
        assert!(c.get("c").is_some());
    }

    #[test]
    fn size_never_exceeds_the_configured_maximum() {
        let (mut c, _clock) = cache(3);
        for i in 0..10 {
            c.set(&format!("k{i}"), i.to_string(), 60);
            assert!(c.len() <= 3);
        }
    }

    #[test]
    fn capacity_has_a_floor_of_one() {
        let clock = Arc::new(ManualClock::new(0));
        let mut c: TtlCache<String> = TtlCache::new(0, clock);
        c.set("a", "1".to_string(), 60);
        c.set("b", "2".to_string(), 60);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("b"), Some("2".to_string()));
    }
}
