//! Edge Cache - a UDP content cache node with adaptive TTL
//!
//! Serves client requests from an LRU+TTL store, forwards misses to an origin
//! over UDP, and shortens TTLs for services whose request rate spikes.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod protocol;
pub mod server;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheNode;
pub use config::{Config, Role};
pub use error::{CacheError, Result};
pub use protocol::{Frame, Outcome};
pub use server::{CacheServer, OriginServer, SharedNode};
pub use tasks::spawn_maintenance_task;
