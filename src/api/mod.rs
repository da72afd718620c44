//! API Module
//!
//! HTTP handlers and routing for the admin/telemetry API served next to the
//! UDP cache.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Get cache node statistics
//! - `GET /policy` - Get adaptive TTL state
//! - `GET /entries?key=...` - Inspect a resident entry

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
