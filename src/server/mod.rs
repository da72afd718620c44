//! Server Module
//!
//! UDP front ends: the cache server that drives a [`CacheNode`] from client and
//! origin sockets, and the origin responder it forwards misses to.

mod cache_server;
mod origin;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::CacheNode;

pub use cache_server::CacheServer;
pub use origin::OriginServer;

/// Largest datagram read from a socket.
pub const MAX_DATAGRAM: usize = 65_535;

/// Cache node shared between socket loops, the maintenance task and the
/// admin API. Holding the write lock for a whole event gives each event
/// run-to-completion semantics.
pub type SharedNode = Arc<RwLock<CacheNode<SocketAddr>>>;
