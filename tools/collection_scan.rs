mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use catalog::{Catalog, CatalogStore};
use common::Folder;
use indexer::collection::{CollectionIndexer, IndexingRequest};
use indexer::external::{
    ChannelProgress, FsFileStat, LoftyTagReader, NoopArtworkIndexer, WalkdirWalker,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = config::config_path_from_env();
    let (cfg, created) = config::load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    if cfg.collection_folders.is_empty() {
        warn!(
            "No collection folders configured; add some to {:?} and re-run",
            config_path
        );
        return Ok(());
    }

    let catalog_path = config::resolve_path(&config_path, &cfg.catalog_path);
    let store = CatalogStore::open(&catalog_path)?;
    store.init_tables()?;

    let mut roots: Vec<PathBuf> = Vec::new();
    for folder_path in &cfg.collection_folders {
        let resolved = config::resolve_path(&config_path, folder_path);
        if !resolved.exists() {
            warn!("Collection folder {:?} not found; skipping", resolved);
            continue;
        }
        store.add_folder(&Folder::new(&resolved.to_string_lossy()))?;
        roots.push(resolved);
    }
    if roots.is_empty() {
        warn!("None of the configured collection folders exist.");
        return Ok(());
    }

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            info!("Progress: {:?}", event);
        }
    });

    let catalog: Arc<dyn Catalog> = Arc::new(store);
    let collection_indexer = Arc::new(CollectionIndexer::new(
        catalog,
        Arc::new(LoftyTagReader),
        Arc::new(FsFileStat),
        Arc::new(WalkdirWalker),
        Arc::new(NoopArtworkIndexer),
        Arc::new(ChannelProgress::new(progress_tx)),
    ));
    let request = IndexingRequest {
        skip_removed_files_during_refresh: cfg.skip_removed_files_during_refresh,
    };

    indexer::worker::start_indexing(Arc::clone(&collection_indexer), request.clone()).await?;

    if cfg.watch_collection {
        let debounce = Duration::from_secs(if cfg.watch_debounce_secs == 0 {
            2
        } else {
            cfg.watch_debounce_secs
        });
        let _watcher =
            indexer::watch::watch_collection(collection_indexer, request, roots, debounce)?;
        shutdown_signal().await;
        info!("Shutdown signal received.");
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(signal) => signal,
            Err(err) => {
                warn!("Failed to install terminate signal handler: {}", err);
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", err);
        }
    }
}
