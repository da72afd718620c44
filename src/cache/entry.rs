//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

use bytes::Bytes;

// == Cache Entry ==
/// Represents a single resident entry with its payload and expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Opaque payload returned by the origin
    pub value: Bytes,
    /// When the entry was last (re)inserted
    pub inserted_at: Instant,
    /// Absolute expiry, inserted_at + effective TTL at insertion
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` after `now`.
    pub fn new(value: Bytes, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            expires_at: now + ttl,
        }
    }

    // == Is Fresh ==
    /// Checks whether the entry may still be served.
    ///
    /// Boundary condition: an entry is stale once `now >= expires_at`, so an
    /// entry inserted at T with TTL D is fresh for every `now < T + D`.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once stale.
    pub fn ttl_remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::from_static(b"data"), Duration::from_secs(5), now);

        assert_eq!(entry.value, Bytes::from_static(b"data"));
        assert_eq!(entry.inserted_at, now);
        assert_eq!(entry.expires_at, now + Duration::from_secs(5));
    }

    #[test]
    fn test_fresh_before_expiry() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::new(), Duration::from_secs(2), now);

        assert!(entry.is_fresh(now));
        assert!(entry.is_fresh(now + Duration::from_millis(1999)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::new(), Duration::from_secs(2), now);

        assert!(!entry.is_fresh(now + Duration::from_secs(2)), "stale at T+D");
        assert!(!entry.is_fresh(now + Duration::from_secs(3)));
    }

    #[test]
    fn test_ttl_remaining() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::new(), Duration::from_secs(10), now);

        assert_eq!(
            entry.ttl_remaining(now + Duration::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(entry.ttl_remaining(now + Duration::from_secs(11)), Duration::ZERO);
    }
}
