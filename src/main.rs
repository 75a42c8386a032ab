//! Request Cache service
//!
//! Serves a shared TTL cache over HTTP and deduplicates read-through
//! fetches to a configured upstream.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use request_cache::api::{create_router, AppState};
use request_cache::{spawn_sweep_task, Config};

/// Main entry point for the request cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the shared cache and optional upstream client
/// 4. Start the expiry sweep, unless disabled
/// 5. Serve the Axum router on the configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "request_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting request cache service");

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_ttl={}s, port={}, sweep_interval={}s, upstream={}",
        config.default_ttl,
        config.server_port,
        config.sweep_interval,
        config.upstream_url.as_deref().unwrap_or("<none>")
    );

    let state = AppState::from_config(&config).context("failed to initialize application state")?;
    info!("Request cache initialized");

    let sweep_handle = if config.sweep_interval > 0 {
        let handle = spawn_sweep_task(state.cache.clone(), config.sweep_interval);
        info!("Expiry sweep task started");
        Some(handle)
    } else {
        info!("Expiry sweep disabled, expired entries are purged on read");
        None
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweep task.
async fn shutdown_signal(sweep_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

    if let Some(handle) = sweep_handle {
        handle.abort();
        info!("Expiry sweep task stopped");
    }
}
