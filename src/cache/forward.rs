//! Forwarding Table Module
//!
//! Translates between client-chosen request ids, which are only unique per
//! client, and cache-local forward ids used on the single upstream channel.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{CacheError, Result};

// == Pending Forward ==
/// A miss awaiting its origin reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingForward<A> {
    /// Request id as sent by the client, echoed on the reply
    pub original_request_id: u32,
    /// Where the reply goes
    pub client: A,
    /// Requested resource key
    pub key: String,
    /// When the forward was sent upstream
    pub forwarded_at: Instant,
}

// == Forward Table ==
/// Allocates forward ids and remembers who is waiting on each.
///
/// Ids come from a strictly increasing u32 counter. Wrapping is allowed, but
/// landing on an id that is still pending is a fatal fault: the two forwards
/// would alias and one client would receive the other's reply.
#[derive(Debug)]
pub struct ForwardTable<A> {
    next_id: u32,
    pending: HashMap<u32, PendingForward<A>>,
}

impl<A> Default for ForwardTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> ForwardTable<A> {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates a table whose first allocated id is `first_id`.
    pub fn starting_at(first_id: u32) -> Self {
        Self {
            next_id: first_id,
            pending: HashMap::new(),
        }
    }

    // == Allocate ==
    /// Records a new forward and returns the id to send upstream.
    pub fn allocate(
        &mut self,
        original_request_id: u32,
        client: A,
        key: String,
        now: Instant,
    ) -> Result<u32> {
        let forward_id = self.next_id;
        if self.pending.contains_key(&forward_id) {
            return Err(CacheError::ForwardIdExhausted(forward_id));
        }
        self.next_id = forward_id.wrapping_add(1);
        self.pending.insert(
            forward_id,
            PendingForward {
                original_request_id,
                client,
                key,
                forwarded_at: now,
            },
        );
        Ok(forward_id)
    }

    // == Complete ==
    /// Removes and returns the forward matching an origin reply.
    ///
    /// None means the reply is orphaned.
    pub fn complete(&mut self, forward_id: u32) -> Option<PendingForward<A>> {
        self.pending.remove(&forward_id)
    }

    // == Expire ==
    /// Removes forwards older than `timeout`, oldest id first.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<(u32, PendingForward<A>)> {
        let mut expired: Vec<u32> = self
            .pending
            .iter()
            .filter(|(_, fwd)| now.saturating_duration_since(fwd.forwarded_at) >= timeout)
            .map(|(id, _)| *id)
            .collect();
        expired.sort_unstable();

        expired
            .into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|fwd| (id, fwd)))
            .collect()
    }

    /// Drops every pending forward, returning how many were discarded.
    pub fn discard_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    #[cfg(test)]
    pub(crate) fn get(&self, forward_id: u32) -> Option<&PendingForward<A>> {
        self.pending.get(&forward_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Moves the counter, standing in for a full wrap of the id space.
    #[cfg(test)]
    pub(crate) fn rewind(&mut self, next_id: u32) {
        self.next_id = next_id;
    }
}
