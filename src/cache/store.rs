//! Cache Store Module
//!
//! Bounded key/value storage combining a HashMap with LRU tracking and lazy
//! TTL evaluation. Stale entries are never swept; they count as misses on
//! lookup and are overwritten by the next fetch or evicted when their slot is
//! needed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;

use crate::cache::{CacheEntry, LruTracker};

// == Lookup ==
/// Result of probing the store for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Resident and `now < expiry`
    Fresh(Bytes),
    /// Resident but expired, served as a miss
    Stale,
    /// Not resident
    Absent,
}

impl Lookup {
    pub fn found(&self) -> bool {
        !matches!(self, Lookup::Absent)
    }

    pub fn fresh(&self) -> bool {
        matches!(self, Lookup::Fresh(_))
    }

    #[cfg(test)]
    pub(crate) fn value(&self) -> Option<&Bytes> {
        match self {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Resident {
    entry: CacheEntry,
    slot: usize,
}

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key to entry and recency slot
    entries: HashMap<String, Resident>,
    /// LRU access tracker
    lru: LruTracker,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Entries evicted to make room
    evictions: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruTracker::with_capacity(capacity),
            capacity,
            evictions: 0,
        }
    }

    // == Lookup ==
    /// Probes for `key` without changing recency.
    pub fn lookup(&self, key: &str, now: Instant) -> Lookup {
        match self.entries.get(key) {
            Some(resident) if resident.entry.is_fresh(now) => {
                Lookup::Fresh(resident.entry.value.clone())
            }
            Some(_) => Lookup::Stale,
            None => Lookup::Absent,
        }
    }

    // == Touch ==
    /// Moves `key` to the head of the recency order.
    ///
    /// Returns false if the key is not resident.
    pub fn touch(&mut self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(resident) => {
                self.lru.touch(resident.slot);
                true
            }
            None => false,
        }
    }

    // == Insert ==
    /// Stores `value` under `key`, expiring `ttl` after `now`.
    ///
    /// Re-inserting a resident key overwrites value and expiry and refreshes
    /// recency without evicting. Inserting a new key at capacity evicts the
    /// least recently used entry first; its key is returned.
    pub fn insert(&mut self, key: String, value: Bytes, ttl: Duration, now: Instant) -> Option<String> {
        let entry = CacheEntry::new(value, ttl, now);

        if let Some(resident) = self.entries.get_mut(&key) {
            resident.entry = entry;
            self.lru.touch(resident.slot);
            return None;
        }

        if self.capacity == 0 {
            return None;
        }

        let mut evicted = None;
        if self.entries.len() >= self.capacity {
            if let Some(victim) = self.lru.evict_oldest() {
                trace!(key = %victim, "evicting least recently used entry");
                self.entries.remove(&victim);
                self.evictions += 1;
                evicted = Some(victim);
            }
        }

        let slot = self.lru.push_front(key.clone());
        self.entries.insert(key, Resident { entry, slot });
        evicted
    }

    // == Get ==
    /// Returns the resident entry for inspection, fresh or not.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).map(|resident| &resident.entry)
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &str> + '_ {
        self.lru.iter()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total entries evicted since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}
