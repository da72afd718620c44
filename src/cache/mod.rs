//! Cache Module
//!
//! The cache node core: LRU+TTL storage, the miss forwarding table and the
//! adaptive TTL policy, tied together by [`CacheNode`].

mod entry;
mod forward;
mod lru;
mod node;
mod policy;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use forward::{ForwardTable, PendingForward};
pub use lru::LruTracker;
pub use node::{CacheNode, Effect, TickReport};
pub use policy::{extract_service, AdaptiveTtlPolicy, PolicyChange, PolicyConfig, TimeBucket};
pub use stats::CacheStats;
pub use store::{CacheStore, Lookup};
