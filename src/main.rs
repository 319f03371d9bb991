//! User Registry - user resource service
//!
//! Serves the user REST API over the configured store, cache and broker.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_registry::{create_router, AppState, BackgroundTasks, Config};

/// Main entry point for the user service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect store, cache and broker clients and start background tasks
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. On SIGINT/SIGTERM stop serving, then let queued events drain
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_registry=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting user registry service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: port={}, cache_prefix={}, cache_ttl={}s, queue={}, timeout={}ms",
        config.server_port,
        config.cache_prefix,
        config.cache_ttl().as_secs(),
        config.event_queue,
        config.external_timeout_ms
    );

    let (state, tasks) = AppState::connect(&config).await?;
    info!("Store, cache and broker clients initialized");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    drain_background(tasks, config.external_timeout()).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Stops the cache sweep and gives the event worker time to flush its queue.
async fn drain_background(tasks: BackgroundTasks, publish_timeout: Duration) {
    if let Some(cleanup) = tasks.cache_cleanup {
        cleanup.abort();
    }

    // Router and state are gone, so the worker sees a closed channel once drained
    let grace = publish_timeout * 2;
    match tokio::time::timeout(grace, tasks.event_worker).await {
        Ok(_) => info!("Event queue drained"),
        Err(_) => warn!(
            "Event worker still busy after {}ms, remaining events dropped",
            grace.as_millis()
        ),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
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
