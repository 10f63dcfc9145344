//! Background entry point for a reconciliation run. The run itself is
//! blocking and executes on a dedicated blocking thread; the host observes
//! it through the progress channel and the log, never by awaiting
//! acknowledgements.

use std::sync::Arc;

use tracing::{info, warn};

use crate::collection::{CollectionIndexer, IndexingRequest};

pub fn start_indexing(
    indexer: Arc<CollectionIndexer>,
    request: IndexingRequest,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result =
            tokio::task::spawn_blocking(move || indexer.index_collection_if_outdated(&request))
                .await;
        match result {
            Ok(Ok(Some(summary))) => {
                info!(
                    "Indexing run finished: {} removed, {} added, {} updated",
                    summary.removed, summary.added, summary.updated
                );
            }
            Ok(Ok(None)) => {
                info!("Indexing run skipped; collection up to date");
            }
            Ok(Err(err)) => {
                warn!("Indexing run failed: {}", err);
            }
            Err(err) => {
                warn!("Indexing run join error: {}", err);
            }
        }
    })
}
