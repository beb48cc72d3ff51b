//! Cache Store Module
//!
//! Bounded cache combining HashMap storage with LRU tracking and per-entry TTL.
//!
//! TTL and LRU are independent axes: a hot entry whose TTL has elapsed is
//! still a miss, and a fresh but cold entry may be evicted to make room.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::clock::Clock;
use crate::error::ConfigError;

// == TTL Cache ==
/// Bounded key-value storage with per-key expiration and LRU eviction.
pub struct TtlCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_items: usize,
    /// Time source for `stored_at` and expiry checks
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    // == Constructor ==
    /// Creates an empty cache holding at most `max_items` entries.
    ///
    /// A capacity of zero is a configuration error.
    pub fn new(max_items: usize, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if max_items == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_items",
                reason: "cache capacity must be at least 1".to_string(),
            });
        }

        Ok(Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_items,
            clock,
        })
    }

    // == Get ==
    /// Returns the value for `key` if it is present and fresh.
    ///
    /// Expiry uses the TTL recorded by `set`. An expired entry is removed
    /// on the spot. A hit makes the key the most recently used.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();

        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            return None;
        }

        self.lru.touch(key);
        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Overwriting an existing key replaces its value, TTL and recency.
    /// Inserting a new key into a full cache first evicts the least recently
    /// used entry, whatever its remaining TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_items {
            if let Some(evicted_key) = self.lru.evict_oldest() {
                self.entries.remove(&evicted_key);
                self.stats.record_eviction();
            }
        }

        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.insert(key.clone(), entry);
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Clear ==
    /// Removes all entries. Capacity and counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    // == Purge Expired ==
    /// Eagerly removes every expired entry.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
        }

        self.stats.record_expirations(expired_keys.len());
        expired_keys.len()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Current number of tracked entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_items
    }

    fn remove_entry(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.remove(key);
        self.stats.set_total_entries(self.entries.len());
    }
}

impl<V> fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("len", &self.entries.len())
            .field("max_items", &self.max_items)
            .field("stats", &self.stats)
            .finish()
    }
}
