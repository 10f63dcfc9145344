//! Discovers on-disk files absent from the catalog and inserts them,
//! fully filled. One failing file never aborts the batch; it is inserted
//! with its failure recorded and retried by the updater on a later run.

use std::collections::HashSet;
use std::sync::Arc;

use catalog::Catalog;
use common::{safe_path, FolderTrack, IndexablePath, Track};
use tracing::info;

use crate::external::{DirectoryWalker, ProgressEvent, ProgressSink};
use crate::fill::TrackFiller;
use crate::IndexingError;

const PROGRESS_STEP: usize = 20;

pub struct TrackAdder {
    catalog: Arc<dyn Catalog>,
    walker: Arc<dyn DirectoryWalker>,
    filler: Arc<TrackFiller>,
    sink: Arc<dyn ProgressSink>,
}

impl TrackAdder {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        walker: Arc<dyn DirectoryWalker>,
        filler: Arc<TrackFiller>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            catalog,
            walker,
            filler,
            sink,
        }
    }

    pub fn add_tracks_that_are_new(
        &self,
        skip_removed_files: bool,
    ) -> Result<usize, IndexingError> {
        let folders = self.catalog.list_folders()?;
        let paths = self.walker.list_indexable_paths(&folders)?;

        let existing: HashSet<String> = self
            .catalog
            .list_tracks()?
            .into_iter()
            .map(|track| track.safe_path)
            .collect();
        let removed: HashSet<String> = self.catalog.list_removed_paths()?.into_iter().collect();

        let candidates: Vec<IndexablePath> = paths
            .into_iter()
            .filter(|candidate| {
                let safe = safe_path(&candidate.path);
                if existing.contains(&safe) {
                    return false;
                }
                if skip_removed_files && removed.contains(&safe) {
                    return false;
                }
                true
            })
            .collect();

        let total = candidates.len();
        let mut added = 0usize;
        for candidate in candidates {
            let mut track = Track::new(&candidate.path);
            self.filler.fill(&mut track, false);
            self.catalog.add_track(&track)?;
            self.catalog.add_folder_track(&FolderTrack {
                folder_id: candidate.folder_id,
                track_id: track.track_id.clone(),
            })?;

            added += 1;
            if added % PROGRESS_STEP == 0 {
                self.sink.send(ProgressEvent::AddedTracks {
                    count: added,
                    percent: percent_of(added, total),
                });
            }
        }

        if added > 0 {
            if added % PROGRESS_STEP != 0 {
                self.sink.send(ProgressEvent::AddedTracks {
                    count: added,
                    percent: percent_of(added, total),
                });
            }
            info!("Added {} new tracks", added);
        }
        Ok(added)
    }
}

fn percent_of(count: usize, total: usize) -> u32 {
    if total == 0 {
        100
    } else {
        (count * 100 / total) as u32
    }
}
