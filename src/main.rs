//! Edge Cache - a UDP content cache node with adaptive TTL
//!
//! Runs either the cache node (UDP front end plus HTTP admin API) or the
//! stand-in origin, depending on `NODE_ROLE`.

use std::future::IntoFuture;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_cache::api::{create_router, AppState};
use edge_cache::{spawn_maintenance_task, CacheServer, Config, OriginServer, Role};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Origin role: serve echo replies until a shutdown signal
/// 4. Cache role: bind the UDP server, start the maintenance task and the
///    admin API, then serve until a shutdown signal or a fatal fault
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("loading configuration")?;
    config.validate().context("validating configuration")?;
    info!(
        role = ?config.role,
        listen = %config.listen_addr,
        origin = %config.origin_addr,
        capacity = config.capacity,
        ttl = ?config.ttl,
        dynamic_ttl = config.policy.enabled,
        "Configuration loaded"
    );

    match config.role {
        Role::Origin => run_origin(&config).await,
        Role::Cache => run_cache(&config).await,
    }
}

async fn run_origin(config: &Config) -> anyhow::Result<()> {
    let origin = OriginServer::bind(config.listen_addr, config.origin_delay, config.object_size)
        .await
        .context("binding origin socket")?;

    tokio::select! {
        result = origin.run() => result.context("origin server failed")?,
        _ = shutdown_signal() => {}
    }

    info!("Origin shutdown complete");
    Ok(())
}

async fn run_cache(config: &Config) -> anyhow::Result<()> {
    let state = AppState::from_config(config);
    let server = CacheServer::bind(config, state.node.clone())
        .await
        .context("binding cache sockets")?;

    let maintenance = spawn_maintenance_task(state.node.clone(), config.policy.eval_interval);
    info!("Maintenance task started");

    let admin_addr = SocketAddr::from(([0, 0, 0, 0], config.admin_port));
    let listener = tokio::net::TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("binding admin port {}", config.admin_port))?;
    info!("Admin API listening on http://{}", admin_addr);
    let admin = axum::serve(listener, create_router(state.clone())).into_future();

    let outcome = tokio::select! {
        result = server.run() => result.context("cache server stopped"),
        result = admin => result.context("admin server stopped"),
        _ = shutdown_signal() => Ok(()),
    };

    maintenance.abort();
    warn!("Maintenance task aborted");

    let discarded = state.node.write().await.shutdown();
    if discarded > 0 {
        warn!("Discarded {} pending forwards on shutdown", discarded);
    }

    if let Err(err) = &outcome {
        error!(error = %err, "Cache node stopped on fault");
    } else {
        info!("Cache node shutdown complete");
    }
    outcome
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
