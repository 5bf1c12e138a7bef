use anyhow::{Context, Result};
use clap::Parser;
use compute_gateway::{
    api::{create_router, AppState},
    config::{GatewayConfig, StoreBackend},
    platform::{HttpPlatformClient, PlatformClient},
    storage::{MemoryRecordStore, RecordStore, RocksDbRecordStore},
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Gateway arguments
#[derive(Parser)]
#[clap(name = "compute-gateway")]
#[clap(about = "HTTP gateway for datasets and compute jobs on a confidential-computing platform")]
struct Args {
    /// Path to an optional configuration file
    #[clap(long)]
    config: Option<PathBuf>,

    /// API port to listen on (overrides PORT)
    #[clap(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    let dispatcher = config
        .platform
        .dispatcher_address()
        .context("PARCEL_DISPATCHER_ADDRESS must be a 0x-prefixed 20-byte address")?;

    let store: Arc<dyn RecordStore> = match config.storage.backend {
        StoreBackend::Rocksdb => {
            std::fs::create_dir_all(&config.storage.path)?;
            Arc::new(RocksDbRecordStore::open(&config.storage.path)?)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory record store; records are lost on exit");
            Arc::new(MemoryRecordStore::new())
        }
    };
    info!("Record store: {} ({:?})", store.backend_name(), config.storage.path);

    let platform: Arc<dyn PlatformClient> = Arc::new(HttpPlatformClient::new(&config.platform)?);
    info!("Platform API: {}, dispatcher {}", config.platform.api_url, dispatcher);

    std::fs::create_dir_all(&config.storage.scratch_dir)?;

    let state = AppState {
        store: store.clone(),
        platform,
        dispatcher,
        scratch_dir: config.storage.scratch_dir.clone(),
    };
    let app = create_router(state, &config.server);

    let api_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("server is listening on {}", api_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, flushing record store");
    store.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
}
