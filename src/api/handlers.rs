//! API Handlers
//!
//! HTTP request handlers for the admin endpoints. All of them read the shared
//! node; none of them mutate cache state.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use tokio::sync::RwLock;

use crate::cache::CacheNode;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{EntryQuery, EntryResponse, HealthResponse, PolicyResponse, StatsResponse};
use crate::server::SharedNode;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Node shared with the UDP server and maintenance task
    pub node: SharedNode,
}

impl AppState {
    /// Creates a new AppState around an already shared node.
    pub fn new(node: SharedNode) -> Self {
        Self { node }
    }

    /// Creates a new AppState with a fresh node built from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(RwLock::new(CacheNode::from_config(config))))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let node = state.node.read().await;
    Json(StatsResponse::from(node.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /policy
///
/// Reports the adaptive TTL settings and the services currently penalized.
pub async fn policy_handler(State(state): State<AppState>) -> Json<PolicyResponse> {
    let node = state.node.read().await;
    Json(PolicyResponse::new(node.policy(), node.base_ttl()))
}

/// Handler for GET /entries?key=...
///
/// Inspects a resident entry without touching its recency.
pub async fn entry_handler(
    State(state): State<AppState>,
    Query(query): Query<EntryQuery>,
) -> Result<Json<EntryResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let node = state.node.read().await;
    let entry = node
        .store()
        .get(&query.key)
        .ok_or_else(|| CacheError::NotFound(query.key.clone()))?;

    Ok(Json(EntryResponse::new(&query.key, entry, Instant::now())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::cache::PolicyConfig;
    use crate::protocol::Frame;

    fn test_state() -> AppState {
        let node = CacheNode::new(8, Duration::from_secs(60), PolicyConfig::default());
        AppState::new(Arc::new(RwLock::new(node)))
    }

    async fn populate(state: &AppState, key: &str) {
        let client = SocketAddr::from(([127, 0, 0, 1], 40000));
        let now = Instant::now();
        let mut node = state.node.write().await;
        node.on_client_request(client, Frame::new(1, key), now).unwrap();
        let forward_id = 1;
        node.on_origin_reply(Frame::new(forward_id, key), Bytes::from_static(b"xyz"), now)
            .unwrap();
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        populate(&state, "/svc/seg-1").await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.total_requests, 1);
        assert_eq!(response.misses, 1);
        assert_eq!(response.hits, 0);
        assert_eq!(response.total_entries, 1);
        assert_eq!(response.pending_forwards, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }

    #[tokio::test]
    async fn test_policy_handler_disabled() {
        let response = policy_handler(State(test_state())).await;
        assert!(!response.enabled);
        assert_eq!(response.base_ttl_ms, 60_000);
        assert!(response.penalized.is_empty());
    }

    #[tokio::test]
    async fn test_entry_handler_found() {
        let state = test_state();
        populate(&state, "/svc/seg-1").await;

        let query = EntryQuery {
            key: "/svc/seg-1".to_string(),
        };
        let response = entry_handler(State(state), Query(query)).await.unwrap();
        assert_eq!(response.service, "svc");
        assert!(response.fresh);
        assert_eq!(response.size, 3);
    }

    #[tokio::test]
    async fn test_entry_handler_not_found() {
        let query = EntryQuery {
            key: "/missing".to_string(),
        };
        let result = entry_handler(State(test_state()), Query(query)).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_entry_handler_empty_key() {
        let query = EntryQuery { key: String::new() };
        let result = entry_handler(State(test_state()), Query(query)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
