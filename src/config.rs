//! Configuration Module
//!
//! Handles loading and validating node configuration from environment variables.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::PolicyConfig;
use crate::error::{CacheError, Result};

/// Which process this binary runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Caching node between clients and origin
    Cache,
    /// Authoritative origin responder
    Origin,
}

impl FromStr for Role {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cache" => Ok(Role::Cache),
            "origin" => Ok(Role::Origin),
            other => Err(CacheError::InvalidConfig(format!("unknown role '{}'", other))),
        }
    }
}

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Process role
    pub role: Role,
    /// UDP address clients send requests to (or the origin listens on)
    pub listen_addr: SocketAddr,
    /// Upstream origin UDP address
    pub origin_addr: SocketAddr,
    /// HTTP admin/telemetry port
    pub admin_port: u16,
    /// Payload bytes appended to forwards and replies
    pub object_size: usize,
    /// Base TTL for stored entries
    pub ttl: Duration,
    /// Maximum number of resident entries
    pub capacity: usize,
    /// Processing delay applied to hit replies
    pub cache_delay: Duration,
    /// Service delay of the origin role
    pub origin_delay: Duration,
    /// Adaptive TTL tunables
    pub policy: PolicyConfig,
    /// Age after which a pending forward is dropped, None keeps them forever
    pub forward_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NODE_ROLE` - `cache` or `origin` (default: cache)
    /// - `LISTEN_ADDR` - UDP listen address (default: 0.0.0.0:8080)
    /// - `ORIGIN_ADDR` - Origin UDP address (default: 127.0.0.1:8081)
    /// - `ADMIN_PORT` - HTTP admin port (default: 3000)
    /// - `OBJECT_SIZE` - Payload bytes (default: 1024)
    /// - `CACHE_TTL_MS` - Base TTL (default: 5000)
    /// - `CACHE_CAPACITY` - Capacity in entries (default: 64)
    /// - `CACHE_DELAY_MS` - Hit processing delay (default: 1)
    /// - `ORIGIN_DELAY_MS` - Origin service delay (default: 1)
    /// - `DYNAMIC_TTL` - Enable adaptive TTL (default: false)
    /// - `TTL_WINDOW_MS` - Measurement window (default: 10000)
    /// - `TTL_THRESHOLD` - Spike threshold (default: 0.5)
    /// - `TTL_REDUCTION` - TTL reduction fraction (default: 0.5)
    /// - `TTL_EVAL_INTERVAL_MS` - Evaluation interval (default: 1000)
    /// - `TTL_BUCKET_MS` - Bucket duration (default: 1000)
    /// - `FORWARD_TIMEOUT_MS` - Pending forward timeout, 0 disables (default: 0)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let policy_defaults = defaults.policy.clone();

        let role = match env::var("NODE_ROLE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.role,
        };
        let forward_timeout_ms: u64 = env_or("FORWARD_TIMEOUT_MS", 0);

        Ok(Self {
            role,
            listen_addr: env_or("LISTEN_ADDR", defaults.listen_addr),
            origin_addr: env_or("ORIGIN_ADDR", defaults.origin_addr),
            admin_port: env_or("ADMIN_PORT", defaults.admin_port),
            object_size: env_or("OBJECT_SIZE", defaults.object_size),
            ttl: env_ms("CACHE_TTL_MS", defaults.ttl),
            capacity: env_or("CACHE_CAPACITY", defaults.capacity),
            cache_delay: env_ms("CACHE_DELAY_MS", defaults.cache_delay),
            origin_delay: env_ms("ORIGIN_DELAY_MS", defaults.origin_delay),
            policy: PolicyConfig {
                enabled: env_or("DYNAMIC_TTL", policy_defaults.enabled),
                window: env_ms("TTL_WINDOW_MS", policy_defaults.window),
                threshold: env_or("TTL_THRESHOLD", policy_defaults.threshold),
                reduction: env_or("TTL_REDUCTION", policy_defaults.reduction),
                eval_interval: env_ms("TTL_EVAL_INTERVAL_MS", policy_defaults.eval_interval),
                bucket_duration: env_ms("TTL_BUCKET_MS", policy_defaults.bucket_duration),
            },
            forward_timeout: (forward_timeout_ms > 0)
                .then(|| Duration::from_millis(forward_timeout_ms)),
        })
    }

    /// Rejects parameter combinations the node cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig("ttl must be non-zero".to_string()));
        }
        self.policy.validate()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: Role::Cache,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            origin_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            admin_port: 3000,
            object_size: 1024,
            ttl: Duration::from_secs(5),
            capacity: 64,
            cache_delay: Duration::from_millis(1),
            origin_delay: Duration::from_millis(1),
            policy: PolicyConfig::default(),
            forward_timeout: None,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_ms(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}
