//! PDF Splitter Server
//!
//! Splits uploaded PDFs by page range and serves the result through
//! expiring download links.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_splitter::config::Config;
use pdf_splitter::routes;
use pdf_splitter::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_splitter=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting PDF Splitter v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        upload_dir = %config.storage.upload_dir.display(),
        output_dir = %config.storage.output_dir.display(),
        range_policy = %config.split.range_policy,
        "Storage configured"
    );
    tracing::info!(
        rate_limit_secs = config.lifecycle.rate_limit_window.as_secs(),
        file_ttl_secs = config.lifecycle.creation_ttl.as_secs(),
        download_ttl_secs = config.lifecycle.download_ttl.as_secs(),
        sweep_interval_secs = config.lifecycle.sweep_interval.as_secs(),
        "Lifecycle configured"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    // Create application state
    let app_state = AppState::new(config);

    let removed = app_state
        .storage()
        .prepare()
        .await
        .context("Failed to prepare scratch directories")?;
    if removed > 0 {
        tracing::info!("Removed {} leftover files from a previous run", removed);
    }

    // Background expiry
    let sweeper = app_state.sweeper().start();

    let app = routes::app(app_state.clone());

    // Start server with graceful shutdown
    tracing::info!("PDF Splitter listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    sweeper.abort();
    let purged = app_state.shutdown().await;
    tracing::info!("Removed {} artifacts on shutdown", purged);

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
