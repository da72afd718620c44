//! API Routes
//!
//! Configures the Axum router for the admin/telemetry endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{entry_handler, health_handler, policy_handler, stats_handler, AppState};

/// Creates the admin router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Cache node counters
/// - `GET /policy` - Adaptive TTL state
/// - `GET /entries?key=...` - Inspect one resident entry
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/policy", get(policy_handler))
        .route("/entries", get(entry_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
