//! Sequences the reconciliation phases: outdated check, removal,
//! addition, update, artwork handoff. Phases run strictly one after
//! another; a run mutex keeps overlapping requests (startup scan vs.
//! watcher) sequential.

use std::sync::Arc;

use catalog::Catalog;
use parking_lot::Mutex;
use tracing::info;

use crate::add::TrackAdder;
use crate::external::{
    ArtworkIndexer, DirectoryWalker, FileStat, ProgressEvent, ProgressSink, TagReader,
};
use crate::fill::TrackFiller;
use crate::outdated::CollectionChecker;
use crate::remove::TrackRemover;
use crate::update::TrackUpdater;
use crate::verify::TrackVerifier;
use crate::IndexingError;

/// Explicit per-run arguments; the engine never reads ambient
/// configuration.
#[derive(Clone, Debug, Default)]
pub struct IndexingRequest {
    pub skip_removed_files_during_refresh: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct IndexingSummary {
    pub removed: usize,
    pub added: usize,
    pub updated: usize,
}

pub struct CollectionIndexer {
    checker: CollectionChecker,
    remover: TrackRemover,
    adder: TrackAdder,
    updater: TrackUpdater,
    artwork: Arc<dyn ArtworkIndexer>,
    sink: Arc<dyn ProgressSink>,
    run_lock: Mutex<()>,
}

impl CollectionIndexer {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        tags: Arc<dyn TagReader>,
        stat: Arc<dyn FileStat>,
        walker: Arc<dyn DirectoryWalker>,
        artwork: Arc<dyn ArtworkIndexer>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let filler = Arc::new(TrackFiller::new(tags, Arc::clone(&stat)));
        Self {
            checker: CollectionChecker::new(Arc::clone(&catalog), Arc::clone(&walker)),
            remover: TrackRemover::new(Arc::clone(&catalog), Arc::clone(&stat)),
            adder: TrackAdder::new(
                Arc::clone(&catalog),
                walker,
                Arc::clone(&filler),
                Arc::clone(&sink),
            ),
            updater: TrackUpdater::new(
                catalog,
                filler,
                TrackVerifier::new(stat),
                Arc::clone(&sink),
            ),
            artwork,
            sink,
            run_lock: Mutex::new(()),
        }
    }

    /// Fast no-op when the pre-flight check finds nothing to do.
    pub fn index_collection_if_outdated(
        &self,
        request: &IndexingRequest,
    ) -> Result<Option<IndexingSummary>, IndexingError> {
        let _guard = self.run_lock.lock();
        if !self.checker.is_outdated() {
            info!("Collection is up to date");
            return Ok(None);
        }
        self.run(request).map(Some)
    }

    pub fn index_collection(
        &self,
        request: &IndexingRequest,
    ) -> Result<IndexingSummary, IndexingError> {
        let _guard = self.run_lock.lock();
        self.run(request)
    }

    fn run(&self, request: &IndexingRequest) -> Result<IndexingSummary, IndexingError> {
        self.sink.send(ProgressEvent::IndexingStarted);

        self.sink.send(ProgressEvent::RemovingTracks);
        let mut removed = self.remover.remove_tracks_that_do_not_belong_to_folders()?;
        removed += self.remover.remove_tracks_that_are_not_found_on_disk()?;

        let added = self
            .adder
            .add_tracks_that_are_new(request.skip_removed_files_during_refresh)?;
        let updated = self.updater.update_tracks_that_are_out_of_date()?;

        self.sink.send(ProgressEvent::IndexingArtwork);
        self.artwork.index_album_artwork();

        self.sink.send(ProgressEvent::IndexingFinished);
        info!(
            "Collection reconciled: {} removed, {} added, {} updated",
            removed, added, updated
        );
        Ok(IndexingSummary {
            removed,
            added,
            updated,
        })
    }
}
