//! # Filebox Server
//!
//! Main binary: loads configuration, connects the storage backend, and serves
//! the file API until Ctrl-C / SIGTERM.

use clap::Parser;
use filebox_api::{AppState, build_router};
use filebox_common::config::{self, StorageBackend};
use filebox_storage::{FileStore, LocalFileStore, S3FileStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "filebox", version, about = "File upload/download API over object storage")]
struct Cli {
    /// Path to a config file (TOML). Defaults to ./config.toml if present.
    #[arg(long, env = "FILEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load(cli.config.as_deref())?;

    // Initialize tracing (structured logging)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "filebox=debug,tower_http=debug".into());
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    }

    tracing::info!("Starting Filebox v{}", env!("CARGO_PKG_VERSION"));

    // Fired on shutdown; cancels in-flight storage calls and stops the server.
    let shutdown = CancellationToken::new();

    // === Object Storage ===
    let store: Arc<dyn FileStore> = match config.storage.backend {
        StorageBackend::S3 => {
            Arc::new(S3FileStore::connect(&config.storage, shutdown.clone()).await?)
        }
        StorageBackend::Local => {
            Arc::new(LocalFileStore::open(&config.storage, shutdown.clone()).await?)
        }
    };
    tracing::info!(
        backend = ?config.storage.backend,
        container = %config.storage.container,
        "Object storage ready"
    );

    // === REST API Server ===
    let router = build_router(AppState::new(store, config.files.clone()));
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("REST API listening on http://{addr}");

    tokio::spawn(wait_for_signal(shutdown.clone()));

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
