//! Adaptive TTL Policy Module
//!
//! Counts requests per service in fixed-duration buckets and periodically
//! compares the recent half of the measurement window against the earlier
//! half. Services whose request rate spiked get a reduced TTL for entries
//! inserted while they stay penalized.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::{CacheError, Result};

// == Policy Config ==
/// Tunables of the adaptive TTL policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    /// Whether requests are measured and TTLs adjusted at all
    pub enabled: bool,
    /// Trailing span of buckets considered by an evaluation
    pub window: Duration,
    /// A service is penalized when recent/earlier exceeds 1 + threshold
    pub threshold: f64,
    /// Fraction of the base TTL removed while penalized
    pub reduction: f64,
    /// Time between evaluations
    pub eval_interval: Duration,
    /// Age at which the active bucket is closed
    pub bucket_duration: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window: Duration::from_secs(10),
            threshold: 0.5,
            reduction: 0.5,
            eval_interval: Duration::from_secs(1),
            bucket_duration: Duration::from_secs(1),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.reduction) {
            return Err(CacheError::InvalidConfig(format!(
                "ttl reduction {} must be in [0, 1)",
                self.reduction
            )));
        }
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(CacheError::InvalidConfig(format!(
                "ttl threshold {} must be non-negative",
                self.threshold
            )));
        }
        if self.window.is_zero() || self.eval_interval.is_zero() || self.bucket_duration.is_zero()
        {
            return Err(CacheError::InvalidConfig(
                "ttl window, evaluation interval and bucket duration must be non-zero".to_string(),
            ));
        }
        if self.bucket_duration > self.window / 2 {
            return Err(CacheError::InvalidConfig(format!(
                "bucket duration {:?} must not exceed half the window {:?}",
                self.bucket_duration, self.window
            )));
        }
        Ok(())
    }
}

// == Service Extraction ==
/// Returns the first path segment of a resource key.
///
/// `"/service-3/seg-7"` and `"service-3/seg-7"` both yield `"service-3"`; a
/// key without a further `/` yields itself minus any leading slash.
pub fn extract_service(key: &str) -> &str {
    let rest = key.strip_prefix('/').unwrap_or(key);
    match rest.find('/') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

// == Time Bucket ==
/// Request counts per service observed during one bucket.
#[derive(Debug, Clone)]
pub struct TimeBucket {
    pub start: Instant,
    pub counts: HashMap<String, u64>,
}

impl TimeBucket {
    fn new(start: Instant) -> Self {
        Self {
            start,
            counts: HashMap::new(),
        }
    }
}

// == Policy Change ==
/// Services that entered or left the penalized set in one evaluation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PolicyChange {
    pub penalized: Vec<String>,
    pub released: Vec<String>,
}

impl PolicyChange {
    pub fn is_empty(&self) -> bool {
        self.penalized.is_empty() && self.released.is_empty()
    }
}

// == Adaptive TTL Policy ==
#[derive(Debug)]
pub struct AdaptiveTtlPolicy {
    config: PolicyConfig,
    buckets: VecDeque<TimeBucket>,
    penalized: HashSet<String>,
}

impl AdaptiveTtlPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            buckets: VecDeque::new(),
            penalized: HashSet::new(),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    // == Record Request ==
    /// Counts one request for `service` in the active bucket.
    ///
    /// Opens a new bucket once the active one is `bucket_duration` old. Empty
    /// service names are never counted.
    pub fn record_request(&mut self, service: &str, now: Instant) {
        if !self.config.enabled || service.is_empty() {
            return;
        }

        let needs_bucket = match self.buckets.back() {
            Some(bucket) => now.saturating_duration_since(bucket.start) >= self.config.bucket_duration,
            None => true,
        };
        if needs_bucket {
            self.buckets.push_back(TimeBucket::new(now));
        }

        if let Some(bucket) = self.buckets.back_mut() {
            match bucket.counts.get_mut(service) {
                Some(count) => *count += 1,
                None => {
                    bucket.counts.insert(service.to_string(), 1);
                }
            }
        }
    }

    // == Evaluate ==
    /// Drops buckets older than the window and recomputes the penalized set.
    ///
    /// Buckets starting at or after `now - window/2` form the recent half.
    /// A service with no earlier requests but some recent ones is treated as
    /// an infinite ratio and always penalized.
    pub fn evaluate(&mut self, now: Instant) -> PolicyChange {
        if !self.config.enabled {
            return PolicyChange::default();
        }

        if let Some(cutoff) = now.checked_sub(self.config.window) {
            while self.buckets.front().is_some_and(|b| b.start < cutoff) {
                self.buckets.pop_front();
            }
        }
        let midpoint = now.checked_sub(self.config.window / 2);

        let mut recent: HashMap<&str, u64> = HashMap::new();
        let mut earlier: HashMap<&str, u64> = HashMap::new();
        for bucket in &self.buckets {
            let half = match midpoint {
                Some(mid) if bucket.start < mid => &mut earlier,
                _ => &mut recent,
            };
            for (service, count) in &bucket.counts {
                *half.entry(service.as_str()).or_insert(0) += count;
            }
        }

        let limit = 1.0 + self.config.threshold;
        let spiking: HashSet<String> = recent
            .iter()
            .filter(|&(service, &r)| match earlier.get(*service).copied().unwrap_or(0) {
                0 => r > 0,
                e => r as f64 / e as f64 > limit,
            })
            .map(|(service, _)| service.to_string())
            .collect();

        let mut change = PolicyChange {
            penalized: spiking.difference(&self.penalized).cloned().collect(),
            released: self.penalized.difference(&spiking).cloned().collect(),
        };
        change.penalized.sort();
        change.released.sort();

        for service in &change.penalized {
            info!(service = %service, "request spike detected, reducing ttl");
        }
        for service in &change.released {
            info!(service = %service, "request rate settled, restoring ttl");
        }
        debug!(
            buckets = self.buckets.len(),
            penalized = spiking.len(),
            "adaptive ttl evaluated"
        );

        self.penalized = spiking;
        change
    }

    // == Effective TTL ==
    /// TTL to apply to an entry of `service` inserted now.
    pub fn effective_ttl(&self, service: &str, base: Duration) -> Duration {
        if self.is_penalized(service) {
            base.mul_f64(1.0 - self.config.reduction)
        } else {
            base
        }
    }

    pub fn is_penalized(&self, service: &str) -> bool {
        self.config.enabled && self.penalized.contains(service)
    }

    /// Penalized services in name order.
    pub fn penalized(&self) -> Vec<String> {
        let mut services: Vec<String> = self.penalized.iter().cloned().collect();
        services.sort();
        services
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> PolicyConfig {
        PolicyConfig {
            enabled: true,
            ..PolicyConfig::default()
        }
    }

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    /// Records one second of traffic at `per_sec` evenly spaced requests.
    fn second(policy: &mut AdaptiveTtlPolicy, t0: Instant, service: &str, sec: u64, per_sec: u64) {
        for i in 0..per_sec {
            policy.record_request(service, at(t0, sec * 1000 + i * (1000 / per_sec)));
        }
    }

    /// Replays `[from, to)` seconds of traffic, evaluating at the end of each.
    fn run(policy: &mut AdaptiveTtlPolicy, t0: Instant, service: &str, from: u64, to: u64, per_sec: u64) {
        for sec in from..to {
            second(policy, t0, service, sec, per_sec);
            policy.evaluate(at(t0, (sec + 1) * 1000));
        }
    }

    #[test]
    fn test_extract_service() {
        assert_eq!(extract_service("/service-1/seg-2"), "service-1");
        assert_eq!(extract_service("/service-1"), "service-1");
        assert_eq!(extract_service("service-1/seg-2"), "service-1");
        assert_eq!(extract_service("file-A"), "file-A");
        assert_eq!(extract_service(""), "");
        assert_eq!(extract_service("/"), "");
    }

    #[test]
    fn test_config_validate() {
        assert!(enabled().validate().is_ok());

        let bad = PolicyConfig {
            reduction: 1.5,
            ..enabled()
        };
        assert!(bad.validate().is_err());

        let bad = PolicyConfig {
            threshold: -0.1,
            ..enabled()
        };
        assert!(bad.validate().is_err());

        let bad = PolicyConfig {
            bucket_duration: Duration::from_secs(6),
            ..enabled()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_disabled_policy_is_inert() {
        let mut policy = AdaptiveTtlPolicy::new(PolicyConfig::default());
        let t0 = Instant::now();

        for sec in 0..5 {
            second(&mut policy, t0, "svc", sec, 10);
        }
        assert_eq!(policy.bucket_count(), 0);
        assert!(policy.evaluate(at(t0, 5000)).is_empty());
        assert_eq!(
            policy.effective_ttl("svc", Duration::from_secs(4)),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn test_buckets_open_per_duration() {
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        policy.record_request("a", t0);
        policy.record_request("a", at(t0, 999));
        assert_eq!(policy.bucket_count(), 1);

        policy.record_request("a", at(t0, 1000));
        assert_eq!(policy.bucket_count(), 2);
    }

    #[test]
    fn test_bucket_counts_per_service() {
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        policy.record_request("a", t0);
        policy.record_request("a", at(t0, 10));
        policy.record_request("b", at(t0, 20));

        let bucket = policy.buckets.back().unwrap();
        assert_eq!(bucket.counts.get("a"), Some(&2));
        assert_eq!(bucket.counts.get("b"), Some(&1));
        assert_eq!(bucket.counts.len(), 2);
    }

    #[test]
    fn test_steady_rate_penalized_during_warm_up() {
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        // earlier half holds 3 buckets against 5 recent ones
        run(&mut policy, t0, "svc", 0, 8, 10);
        assert!(policy.is_penalized("svc"));

        // 4 against 5 is below the threshold
        run(&mut policy, t0, "svc", 8, 9, 10);
        assert!(!policy.is_penalized("svc"));
    }

    #[test]
    fn test_empty_service_never_counted() {
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        policy.record_request("", t0);
        assert_eq!(policy.bucket_count(), 0);

        let change = policy.evaluate(at(t0, 500));
        assert!(change.is_empty());
        assert!(!policy.is_penalized(""));
    }

    #[test]
    fn test_new_service_is_infinite_spike() {
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        for sec in 0..10 {
            second(&mut policy, t0, "steady", sec, 10);
            if sec >= 6 {
                second(&mut policy, t0, "fresh", sec, 1);
            }
        }

        let change = policy.evaluate(at(t0, 10_000));
        assert_eq!(change.penalized, vec!["fresh".to_string()]);
        assert!(policy.is_penalized("fresh"));
        assert!(!policy.is_penalized("steady"));
    }

    #[test]
    fn test_steady_rate_not_penalized() {
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        // first window warms up the earlier half
        run(&mut policy, t0, "svc", 0, 10, 10);
        for sec in 10..20 {
            run(&mut policy, t0, "svc", sec, sec + 1, 10);
            assert!(!policy.is_penalized("svc"), "penalized at {}s", sec + 1);
        }
    }

    #[test]
    fn test_effective_ttl_reduced_while_penalized() {
        let mut policy = AdaptiveTtlPolicy::new(PolicyConfig {
            reduction: 0.25,
            ..enabled()
        });
        let t0 = Instant::now();

        for sec in 6..10 {
            second(&mut policy, t0, "svc", sec, 5);
        }
        policy.evaluate(at(t0, 10_000));

        assert_eq!(
            policy.effective_ttl("svc", Duration::from_secs(4)),
            Duration::from_secs(3)
        );
        assert_eq!(
            policy.effective_ttl("other", Duration::from_secs(4)),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn test_old_buckets_discarded() {
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        for sec in 0..5 {
            second(&mut policy, t0, "svc", sec, 2);
        }
        assert_eq!(policy.bucket_count(), 5);

        policy.evaluate(at(t0, 30_000));
        assert_eq!(policy.bucket_count(), 0);
        assert!(policy.penalized().is_empty());
    }

    #[test]
    fn test_spike_enters_and_leaves_penalized_set() {
        // window 10s, evaluated every 1s; baseline 10 rps, doubled over
        // [20s, 25s), back to baseline afterwards
        let mut policy = AdaptiveTtlPolicy::new(enabled());
        let t0 = Instant::now();

        run(&mut policy, t0, "svc", 0, 20, 10);
        assert!(!policy.is_penalized("svc"));

        // by T + window/2 the recent half runs entirely at double rate
        run(&mut policy, t0, "svc", 20, 25, 20);
        assert!(policy.is_penalized("svc"));

        // one interval after the rate returns: recent 90 vs earlier 60
        second(&mut policy, t0, "svc", 25, 10);
        let change = policy.evaluate(at(t0, 26_000));
        assert_eq!(change.released, vec!["svc".to_string()]);
        assert!(!policy.is_penalized("svc"));

        for sec in 26..31 {
            run(&mut policy, t0, "svc", sec, sec + 1, 10);
            assert!(!policy.is_penalized("svc"), "penalized again at {}s", sec + 1);
        }
    }
}
