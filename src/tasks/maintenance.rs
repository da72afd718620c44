//! Maintenance Task
//!
//! Background task that periodically ticks the cache node: re-evaluates the
//! adaptive TTL policy and sweeps timed-out forwards.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::server::SharedNode;

/// Spawns a background task that ticks the node every `interval`.
///
/// Each tick takes the node's write lock for the whole evaluation, so it is
/// serialized with client requests and origin replies.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_maintenance_task(state.node.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_maintenance_task(node: SharedNode, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, "Starting maintenance task");

        loop {
            tokio::time::sleep(interval).await;

            let report = {
                let mut node = node.write().await;
                node.on_tick(Instant::now())
            };

            if report.timed_out > 0 {
                info!("Maintenance: dropped {} timed-out forwards", report.timed_out);
            }
            if !report.policy.is_empty() {
                info!(
                    penalized = ?report.policy.penalized,
                    released = ?report.policy.released,
                    "Maintenance: adaptive ttl changed"
                );
            } else {
                debug!("Maintenance: nothing changed");
            }
        }
    })
}
