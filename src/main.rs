use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rs_chain_diagnose::{
    api::{self, AppState, ServiceInfo},
    chains::ChainSpec,
    cli::Cli,
    cluster::ClusterHealth,
    cluster::mesh::MeshObserver,
    config::AppConfig,
    core::registry::ScanRegistry,
    kvdb::{RowStore, rocksdb::RocksRowStore},
    store::{BlockStore, fs::FsBlockStore},
    utils::logger::init_logger,
};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let cfg = AppConfig::load(&args.config)?;

    // Initialize logger system
    init_logger(
        &cfg.logging.level,
        cfg.logging.to_file,
        &cfg.logging.file_path,
    );

    info!("✅ Configuration load successful");
    info!(protocol = %cfg.diagnose.protocol, "Chain protocol");
    info!(blocks_store = %cfg.blocks_store.path, "Block archive store");
    info!(search_store = %cfg.search_store.path, "Search index store");
    info!(kvdb = %cfg.kvdb.path, "Chain database");

    // Create shutdown channel
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    // Spawn signal handler task for Ctrl+C
    let shutdown_tx_sigint = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        info!("📡 Received shutdown signal (Ctrl+C)");
        // Send shutdown signal (ignore error if receiver is dropped)
        let _ = shutdown_tx_sigint.send(());
    });

    // SIGTERM handler (Unix only)
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_tx_sigterm = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                info!("📡 Received SIGTERM signal");
                let _ = shutdown_tx_sigterm.send(());
            }
        });
    }

    let chain = ChainSpec::for_protocol(cfg.diagnose.protocol);

    let blocks_store: Arc<dyn BlockStore> = Arc::new(
        FsBlockStore::new(&cfg.blocks_store.path)
            .with_context(|| format!("opening blocks store at {}", cfg.blocks_store.path))?,
    );
    let search_store: Arc<dyn BlockStore> = Arc::new(
        FsBlockStore::new(&cfg.search_store.path)
            .with_context(|| format!("opening search store at {}", cfg.search_store.path))?,
    );

    // The db scans degrade to an explanatory message when the chain
    // database is absent; the file scans keep working either way.
    let row_store: Option<Arc<dyn RowStore>> = match RocksRowStore::open_read_only(&cfg.kvdb.path)
    {
        Ok(store) => {
            info!("✅ Chain database opened at: {}", cfg.kvdb.path);
            Some(Arc::new(store))
        }
        Err(err) => {
            warn!("⚠️ Chain database unavailable ({err:#}), db scans disabled");
            None
        }
    };

    let cluster = Arc::new(ClusterHealth::new(
        cfg.cluster.clone(),
        cfg.diagnose.namespace.clone(),
    )?);
    let mesh = Arc::new(MeshObserver::new(cfg.dmesh.clone())?);

    let listen_addr = args
        .listen_addr
        .unwrap_or_else(|| cfg.server.listen_addr.clone());

    let state = AppState {
        info: Arc::new(ServiceInfo::from_config(&cfg)),
        config: Arc::new(cfg),
        blocks_store,
        search_store,
        row_store,
        chain,
        registry: Arc::new(ScanRegistry::new()),
        cluster,
        mesh,
    };

    let router = api::router(state);

    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid listen address: {listen_addr}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Diagnose service listening on {}", listener.local_addr()?);
    info!("💡 Press Ctrl+C to stop gracefully");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutting down HTTP server");
        })
        .await?;

    info!("✨ Diagnose service exited successfully");
    Ok(())
}
