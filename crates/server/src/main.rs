//! Muster server binary: config, backend wiring, and the serve loop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use muster_blob::{BlobStore, FsBlobStore, MemoryBlobStore};
use muster_bus::EventBus;
use muster_registry::MemoryDeviceRegistry;
use muster_store::{MemoryLocationStore, MemoryMediaStore};

use muster_server::api::AppState;
use muster_server::config::{BlobBackend, MusterConfig};

/// Muster telemetry collection server.
#[derive(Parser, Debug)]
#[command(name = "muster-server", about = "HTTP/WebSocket server for the Muster telemetry backend")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    muster_server::logging::init();

    let config = match &cli.config {
        Some(path) => MusterConfig::load(path)?,
        None => MusterConfig::default(),
    };

    let blobs: Arc<dyn BlobStore> = match config.blob.backend {
        BlobBackend::Memory => {
            Arc::new(MemoryBlobStore::with_max_bytes(config.blob.max_upload_bytes))
        }
        BlobBackend::Fs => Arc::new(
            FsBlobStore::open_with_max_bytes(&config.blob.root, config.blob.max_upload_bytes)
                .await?,
        ),
    };
    info!(
        backend = %config.blob.backend,
        max_upload_bytes = config.blob.max_upload_bytes,
        "blob store ready"
    );

    let state = AppState {
        registry: Arc::new(MemoryDeviceRegistry::new()),
        blobs,
        media: Arc::new(MemoryMediaStore::new()),
        locations: Arc::new(MemoryLocationStore::new()),
        bus: Arc::new(EventBus::new()),
        max_upload_bytes: config.blob.max_upload_bytes,
    };
    let app = muster_server::api::router(state);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "muster-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("muster-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
