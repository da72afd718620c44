//! Cache Statistics Module
//!
//! Cumulative node counters. Every counter only ever increases; gauges such as
//! resident entries and pending forwards are filled in when a snapshot is taken.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache node metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Client requests received (well-formed frames only)
    pub total_requests: u64,
    /// Requests served from the store
    pub hits: u64,
    /// Requests forwarded to the origin
    pub misses: u64,
    /// Misses caused by a resident but expired entry
    pub stale_misses: u64,
    /// Entries evicted due to LRU policy
    pub evictions: u64,
    /// Origin replies with no matching pending forward
    pub orphaned_replies: u64,
    /// Datagrams rejected by the frame decoder
    pub malformed_frames: u64,
    /// Pending forwards dropped by the timeout sweep
    pub forward_timeouts: u64,
    /// Forwards released because the upstream send failed
    pub forward_failures: u64,
    /// Current number of entries in the store
    pub total_entries: usize,
    /// Current number of forwards awaiting the origin
    pub pending_forwards: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / total_requests, or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.total_requests += 1;
        self.hits += 1;
    }

    /// Counts a miss; `stale` marks one caused by an expired resident entry.
    pub fn record_miss(&mut self, stale: bool) {
        self.total_requests += 1;
        self.misses += 1;
        if stale {
            self.stale_misses += 1;
        }
    }

    pub fn record_orphan(&mut self) {
        self.orphaned_replies += 1;
    }

    pub fn record_malformed(&mut self) {
        self.malformed_frames += 1;
    }

    pub fn record_timeouts(&mut self, count: usize) {
        self.forward_timeouts += count as u64;
    }

    pub fn record_forward_failures(&mut self, count: usize) {
        self.forward_failures += count as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss(false);
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_stale_miss_counted_as_miss() {
        let mut stats = CacheStats::new();
        stats.record_miss(true);
        stats.record_miss(false);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.stale_misses, 1);
        assert_eq!(stats.total_requests, 2);
    }

    #[test]
    fn test_anomaly_counters() {
        let mut stats = CacheStats::new();
        stats.record_orphan();
        stats.record_malformed();
        stats.record_malformed();
        stats.record_timeouts(3);
        stats.record_forward_failures(2);
        assert_eq!(stats.forward_failures, 2);
        assert_eq!(stats.orphaned_replies, 1);
        assert_eq!(stats.malformed_frames, 2);
        assert_eq!(stats.forward_timeouts, 3);
        assert_eq!(stats.total_requests, 0);
    }
}
