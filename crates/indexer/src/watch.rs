//! Keeps the catalog synchronized while the host runs: watches the
//! configured folder roots and triggers another reconciliation run after
//! each settled burst of filesystem events.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::collection::{CollectionIndexer, IndexingRequest};

/// The returned watcher must be kept alive by the caller; dropping it
/// stops the notifications.
pub fn watch_collection(
    indexer: Arc<CollectionIndexer>,
    request: IndexingRequest,
    roots: Vec<PathBuf>,
    debounce: Duration,
) -> notify::Result<RecommendedWatcher> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Event>();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        NotifyConfig::default(),
    )?;

    for root in &roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
        info!(
            "Watching {} for changes (debounce {}s)",
            root.display(),
            debounce.as_secs()
        );
    }

    tokio::spawn(async move {
        watch_loop(indexer, request, rx, debounce).await;
    });

    Ok(watcher)
}

async fn watch_loop(
    indexer: Arc<CollectionIndexer>,
    request: IndexingRequest,
    mut rx: UnboundedReceiver<Event>,
    debounce: Duration,
) {
    loop {
        let event = match rx.recv().await {
            Some(event) => event,
            None => break,
        };
        if !is_relevant_event(&event) {
            continue;
        }

        loop {
            tokio::select! {
                _ = tokio::time::sleep(debounce) => {
                    let indexer = Arc::clone(&indexer);
                    let request = request.clone();
                    match tokio::task::spawn_blocking(move || {
                        indexer.index_collection_if_outdated(&request)
                    })
                    .await
                    {
                        Ok(Ok(Some(summary))) => info!(
                            "Auto-refresh finished: {} removed, {} added, {} updated",
                            summary.removed, summary.added, summary.updated
                        ),
                        Ok(Ok(None)) => debug!("Auto-refresh skipped; collection up to date"),
                        Ok(Err(err)) => warn!("Auto-refresh failed: {}", err),
                        Err(err) => warn!("Auto-refresh join error: {}", err),
                    }
                    break;
                }
                maybe_event = rx.recv() => {
                    if let Some(event) = maybe_event {
                        if !is_relevant_event(&event) {
                            continue;
                        }
                    } else {
                        return;
                    }
                }
            }
        }
    }
}

fn is_relevant_event(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
