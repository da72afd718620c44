//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::{extract_service, AdaptiveTtlPolicy, CacheEntry, CacheStats};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Well-formed client requests
    pub total_requests: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Misses on a resident but expired entry
    pub stale_misses: u64,
    /// Number of evictions
    pub evictions: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Forwards still waiting for the origin
    pub pending_forwards: usize,
    /// Origin replies that matched no forward
    pub orphaned_replies: u64,
    /// Datagrams the decoder rejected
    pub malformed_frames: u64,
    /// Forwards dropped by the timeout sweep
    pub forward_timeouts: u64,
    /// Forwards released after a failed upstream send
    pub forward_failures: u64,
    /// Hit rate (hits / total_requests)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            total_requests: stats.total_requests,
            hits: stats.hits,
            misses: stats.misses,
            stale_misses: stats.stale_misses,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            pending_forwards: stats.pending_forwards,
            orphaned_replies: stats.orphaned_replies,
            malformed_frames: stats.malformed_frames,
            forward_timeouts: stats.forward_timeouts,
            forward_failures: stats.forward_failures,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One penalized service in the policy view.
#[derive(Debug, Clone, Serialize)]
pub struct PenalizedService {
    pub service: String,
    pub ttl_ms: u64,
}

/// Response body for the policy endpoint (GET /policy)
#[derive(Debug, Clone, Serialize)]
pub struct PolicyResponse {
    pub enabled: bool,
    pub base_ttl_ms: u64,
    pub window_ms: u64,
    pub threshold: f64,
    pub reduction: f64,
    pub penalized: Vec<PenalizedService>,
}

impl PolicyResponse {
    pub fn new(policy: &AdaptiveTtlPolicy, base_ttl: Duration) -> Self {
        let config = policy.config();
        let penalized = policy
            .penalized()
            .into_iter()
            .map(|service| PenalizedService {
                ttl_ms: millis(policy.effective_ttl(&service, base_ttl)),
                service,
            })
            .collect();

        Self {
            enabled: config.enabled,
            base_ttl_ms: millis(base_ttl),
            window_ms: millis(config.window),
            threshold: config.threshold,
            reduction: config.reduction,
            penalized,
        }
    }
}

/// Response body for the entry inspection endpoint (GET /entries)
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub key: String,
    pub service: String,
    /// Whether a lookup right now would be a hit
    pub fresh: bool,
    /// Remaining lifetime, 0 once stale
    pub ttl_remaining_ms: u64,
    /// Stored payload length
    pub size: usize,
}

impl EntryResponse {
    pub fn new(key: &str, entry: &CacheEntry, now: Instant) -> Self {
        Self {
            key: key.to_string(),
            service: extract_service(key).to_string(),
            fresh: entry.is_fresh(now),
            ttl_remaining_ms: millis(entry.ttl_remaining(now)),
            size: entry.value.len(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::cache::PolicyConfig;

    #[test]
    fn test_stats_response_hit_rate() {
        let stats = CacheStats {
            total_requests: 100,
            hits: 80,
            misses: 20,
            ..CacheStats::default()
        };
        let resp = StatsResponse::from(stats);
        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.misses, 20);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::from(CacheStats::new());
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_policy_response_reports_reduced_ttl() {
        let mut policy = AdaptiveTtlPolicy::new(PolicyConfig {
            enabled: true,
            ..PolicyConfig::default()
        });
        let t0 = Instant::now();
        // all traffic in the recent half of the window
        policy.record_request("hot", t0);
        policy.evaluate(t0 + Duration::from_millis(500));

        let resp = PolicyResponse::new(&policy, Duration::from_secs(4));
        assert!(resp.enabled);
        assert_eq!(resp.base_ttl_ms, 4000);
        assert_eq!(resp.penalized.len(), 1);
        assert_eq!(resp.penalized[0].service, "hot");
        assert_eq!(resp.penalized[0].ttl_ms, 2000);
    }

    #[test]
    fn test_entry_response_fresh_and_stale() {
        let now = Instant::now();
        let entry = CacheEntry::new(Bytes::from_static(b"abcd"), Duration::from_secs(2), now);

        let fresh = EntryResponse::new("/svc/seg-1", &entry, now + Duration::from_millis(500));
        assert_eq!(fresh.service, "svc");
        assert!(fresh.fresh);
        assert_eq!(fresh.ttl_remaining_ms, 1500);
        assert_eq!(fresh.size, 4);

        let stale = EntryResponse::new("/svc/seg-1", &entry, now + Duration::from_secs(2));
        assert!(!stale.fresh);
        assert_eq!(stale.ttl_remaining_ms, 0);
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
