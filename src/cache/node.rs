//! Cache Node Module
//!
//! The cache node state machine. It owns the store, the forwarding table and
//! the adaptive TTL policy, and turns each inbound event into the effects the
//! I/O layer must perform. Every handler runs to completion on `&mut self`,
//! so the I/O layer only has to serialize calls.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cache::{
    extract_service, AdaptiveTtlPolicy, CacheStats, CacheStore, ForwardTable, Lookup,
    PendingForward, PolicyChange, PolicyConfig,
};
use crate::config::Config;
use crate::error::{FrameError, Result};
use crate::protocol::{Frame, Outcome};

// == Effect ==
/// Output the I/O layer performs after a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect<A> {
    /// Send `frame` to a client once `delay` has elapsed
    Reply { to: A, frame: Frame, delay: Duration },
    /// Send `frame` upstream to the origin
    Forward { frame: Frame },
}

// == Tick Report ==
/// What one maintenance tick changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub policy: PolicyChange,
    pub timed_out: usize,
}

// == Cache Node ==
#[derive(Debug)]
pub struct CacheNode<A> {
    store: CacheStore,
    forwards: ForwardTable<A>,
    policy: AdaptiveTtlPolicy,
    stats: CacheStats,
    base_ttl: Duration,
    cache_delay: Duration,
    forward_timeout: Option<Duration>,
}

impl<A: Clone + Debug> CacheNode<A> {
    // == Constructor ==
    /// Creates a node with no hit delay and no forward timeout.
    pub fn new(capacity: usize, base_ttl: Duration, policy: PolicyConfig) -> Self {
        Self {
            store: CacheStore::new(capacity),
            forwards: ForwardTable::new(),
            policy: AdaptiveTtlPolicy::new(policy),
            stats: CacheStats::new(),
            base_ttl,
            cache_delay: Duration::ZERO,
            forward_timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.capacity, config.ttl, config.policy.clone())
            .with_cache_delay(config.cache_delay)
            .with_forward_timeout(config.forward_timeout)
    }

    pub fn with_cache_delay(mut self, delay: Duration) -> Self {
        self.cache_delay = delay;
        self
    }

    pub fn with_forward_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.forward_timeout = timeout;
        self
    }

    /// Replaces the forwarding table, e.g. to start ids elsewhere.
    pub fn with_forward_table(mut self, forwards: ForwardTable<A>) -> Self {
        self.forwards = forwards;
        self
    }

    // == Client Request ==
    /// Serves a hit from the store or forwards a miss upstream.
    ///
    /// Fails only when the forward id space is exhausted.
    pub fn on_client_request(&mut self, from: A, frame: Frame, now: Instant) -> Result<Effect<A>> {
        let Frame { request_id, key } = frame;
        self.policy.record_request(extract_service(&key), now);

        match self.store.lookup(&key, now) {
            Lookup::Fresh(_) => {
                debug!(key = %key, request_id, "cache hit");
                self.store.touch(&key);
                self.stats.record_hit();
                Ok(Effect::Reply {
                    to: from,
                    frame: Frame::reply(request_id, &key, Outcome::Hit),
                    delay: self.cache_delay,
                })
            }
            lookup => {
                let stale = lookup.found();
                let forward_id = self.forwards.allocate(request_id, from, key.clone(), now)?;
                debug!(key = %key, request_id, forward_id, stale, "cache miss, forwarding");
                self.stats.record_miss(stale);
                Ok(Effect::Forward {
                    frame: Frame::new(forward_id, key),
                })
            }
        }
    }

    // == Origin Reply ==
    /// Stores the fetched value and routes the reply to the waiting client.
    ///
    /// Returns None for orphaned replies, which are dropped.
    pub fn on_origin_reply(&mut self, frame: Frame, value: Bytes, now: Instant) -> Option<Effect<A>> {
        let Some(pending) = self.forwards.complete(frame.request_id) else {
            debug!(forward_id = frame.request_id, key = %frame.key, "orphaned origin reply dropped");
            self.stats.record_orphan();
            return None;
        };

        if pending.key != frame.key {
            warn!(
                forward_id = frame.request_id,
                requested = %pending.key,
                echoed = %frame.key,
                "origin echoed a different key, storing under the requested key"
            );
        }

        let ttl = self
            .policy
            .effective_ttl(extract_service(&pending.key), self.base_ttl);
        if let Some(evicted) = self.store.insert(pending.key.clone(), value, ttl, now) {
            debug!(key = %evicted, "evicted to make room");
        }

        Some(Effect::Reply {
            to: pending.client,
            frame: Frame::reply(pending.original_request_id, &pending.key, Outcome::Miss),
            delay: Duration::ZERO,
        })
    }

    /// Counts a datagram the decoder rejected.
    pub fn on_malformed(&mut self, source: &A, err: &FrameError) {
        warn!(from = ?source, error = %err, "dropping malformed frame");
        self.stats.record_malformed();
    }

    // == Forward Failed ==
    /// Releases a forward whose upstream send failed; its reply can never come.
    ///
    /// The client gets no reply, as with a timed-out forward.
    pub fn on_forward_failed(&mut self, forward_id: u32) -> Option<PendingForward<A>> {
        let pending = self.forwards.complete(forward_id)?;
        warn!(
            forward_id,
            key = %pending.key,
            client = ?pending.client,
            "forward to origin failed, releasing"
        );
        self.stats.record_forward_failures(1);
        Some(pending)
    }

    /// Releases every pending forward once the origin reports it is not
    /// listening. Returns how many were released.
    pub fn on_origin_unreachable(&mut self) -> usize {
        let released = self.forwards.discard_all();
        if released > 0 {
            warn!(released, "origin unreachable, releasing pending forwards");
            self.stats.record_forward_failures(released);
        }
        released
    }

    // == Tick ==
    /// Re-evaluates the adaptive policy and sweeps timed-out forwards.
    pub fn on_tick(&mut self, now: Instant) -> TickReport {
        let policy = self.policy.evaluate(now);

        let timed_out = match self.forward_timeout {
            Some(timeout) => {
                let expired = self.forwards.expire(now, timeout);
                for (forward_id, fwd) in &expired {
                    warn!(
                        forward_id,
                        key = %fwd.key,
                        client = ?fwd.client,
                        "origin reply timed out, dropping forward"
                    );
                }
                self.stats.record_timeouts(expired.len());
                expired.len()
            }
            None => 0,
        };

        TickReport { policy, timed_out }
    }

    // == Shutdown ==
    /// Discards outstanding forwards without replying to their clients.
    pub fn shutdown(&mut self) -> usize {
        self.forwards.discard_all()
    }

    // == Stats ==
    /// Returns a snapshot of counters and gauges.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.evictions = self.store.evictions();
        stats.total_entries = self.store.len();
        stats.pending_forwards = self.forwards.len();
        stats
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn policy(&self) -> &AdaptiveTtlPolicy {
        &self.policy
    }

    pub fn base_ttl(&self) -> Duration {
        self.base_ttl
    }

    pub fn pending_forwards(&self) -> usize {
        self.forwards.len()
    }
}
