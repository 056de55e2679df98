//! A single generic LRU+TTL cache shared by the evaluation cache, the
//! analytics cache and the rate-limit window cache (spec §4.7). One
//! implementation, three instantiations — they differ only in `K`, `V`,
//! capacity and TTL.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("TTL-backed cache requires a positive TTL, got zero or negative duration")]
    NonPositiveTtl,
    #[error("cache capacity must be at least 1")]
    ZeroCapacity,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded LRU cache with per-entry TTL expiration.
///
/// Construction enforces `ttl > 0` (spec §4.7's TTLDict invariant): every
/// entry in a zero-TTL cache would be immediately expired, which is never
/// the caller's intent.
#[derive(Debug)]
pub struct TtlLru<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
    /// Most-recently-used key at the back.
    order: VecDeque<K>,
}

impl<K, V> TtlLru<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::NonPositiveTtl);
        }
        if capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            ttl,
            entries: HashMap::new(),
            order: VecDeque::new(),
        })
    }

    /// Insert or overwrite a value, marking it most-recently-used. Evicts
    /// the least-recently-used entry if this would exceed capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.touch(&key);
        } else {
            if self.entries.len() >= self.capacity {
                self.evict_lru();
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Fetch a value, evicting it first if its TTL has elapsed. Marks the
    /// entry most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.touch(key);
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.order.retain(|k| k != key);
        self.entries.remove(key).map(|e| e.value)
    }

    /// Remove every entry for which `predicate` returns true. Used to
    /// invalidate all analytics-cache keys for a tenant on analysis/import
    /// completion (spec §4.7 invalidation rule).
    pub fn invalidate_matching(&mut self, predicate: impl Fn(&K) -> bool) {
        let doomed: Vec<K> = self.entries.keys().filter(|k| predicate(k)).cloned().collect();
        for key in doomed {
            self.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &K) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos).unwrap();
            self.order.push_back(k);
        }
    }

    fn evict_lru(&mut self) {
        if let Some(lru_key) = self.order.pop_front() {
            self.entries.remove(&lru_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_rejected_at_construction() {
        let result: Result<TtlLru<String, i32>, _> = TtlLru::new(10, Duration::ZERO);
        assert_eq!(result.unwrap_err(), CacheError::NonPositiveTtl);
    }

    #[test]
    fn test_zero_capacity_rejected_at_construction() {
        let result: Result<TtlLru<String, i32>, _> = TtlLru::new(0, Duration::from_secs(60));
        assert_eq!(result.unwrap_err(), CacheError::ZeroCapacity);
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache: TtlLru<String, i32> = TtlLru::new(10, Duration::from_secs(60)).unwrap();
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(&1));
    }

    #[test]
    fn test_expired_entry_is_not_returned() {
        let mut cache: TtlLru<String, i32> =
            TtlLru::new(10, Duration::from_nanos(1)).unwrap();
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut cache: TtlLru<i32, i32> = TtlLru::new(2, Duration::from_secs(60)).unwrap();
        cache.insert(1, 10);
        cache.insert(2, 20);
        // Touch 1 so it becomes most-recently-used, leaving 2 as LRU.
        assert_eq!(cache.get(&1), Some(&10));
        cache.insert(3, 30);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(&10));
        assert_eq!(cache.get(&3), Some(&30));
    }

    #[test]
    fn test_invalidate_matching_removes_only_matched_keys() {
        let mut cache: TtlLru<String, i32> = TtlLru::new(10, Duration::from_secs(60)).unwrap();
        cache.insert("tenant-a:stats".to_string(), 1);
        cache.insert("tenant-a:progress".to_string(), 2);
        cache.insert("tenant-b:stats".to_string(), 3);

        cache.invalidate_matching(|k| k.starts_with("tenant-a:"));

        assert_eq!(cache.get(&"tenant-a:stats".to_string()), None);
        assert_eq!(cache.get(&"tenant-a:progress".to_string()), None);
        assert_eq!(cache.get(&"tenant-b:stats".to_string()), Some(&3));
    }
}
