//! Deletes catalog entries that no longer correspond to a configured
//! folder or to a file that still exists on disk.

use std::collections::HashSet;
use std::sync::Arc;

use catalog::Catalog;
use common::{now_ticks, RemovedTrack};
use tracing::info;

use crate::external::FileStat;
use crate::IndexingError;

pub struct TrackRemover {
    catalog: Arc<dyn Catalog>,
    stat: Arc<dyn FileStat>,
}

impl TrackRemover {
    pub fn new(catalog: Arc<dyn Catalog>, stat: Arc<dyn FileStat>) -> Self {
        Self { catalog, stat }
    }

    /// Deletes every track whose folder edges all point at folders that
    /// are no longer configured, along with the orphaned edges themselves.
    pub fn remove_tracks_that_do_not_belong_to_folders(&self) -> Result<usize, IndexingError> {
        let folder_ids: HashSet<String> = self
            .catalog
            .list_folders()?
            .into_iter()
            .map(|folder| folder.folder_id)
            .collect();

        let edges = self.catalog.list_folder_tracks()?;
        let live_tracks: HashSet<&str> = edges
            .iter()
            .filter(|edge| folder_ids.contains(&edge.folder_id))
            .map(|edge| edge.track_id.as_str())
            .collect();

        let mut removed = 0usize;
        for track in self.catalog.list_tracks()? {
            if !live_tracks.contains(track.track_id.as_str()) {
                self.catalog.delete_track(&track.track_id)?;
                removed += 1;
            }
        }

        // Stale edges of tracks kept alive through another folder.
        for edge in &edges {
            if !folder_ids.contains(&edge.folder_id) {
                self.catalog.delete_folder_track(edge)?;
            }
        }

        if removed > 0 {
            info!("Removed {} tracks without a configured folder", removed);
        }
        Ok(removed)
    }

    /// Tombstones and deletes every track whose file vanished, so a later
    /// reappearance of the path can be skipped by policy.
    pub fn remove_tracks_that_are_not_found_on_disk(&self) -> Result<usize, IndexingError> {
        let mut removed = 0usize;
        for track in self.catalog.list_tracks()? {
            if self.stat.exists(&track.path) {
                continue;
            }
            self.catalog.add_removed_track(&RemovedTrack {
                path: track.path.clone(),
                date_removed: now_ticks(),
            })?;
            self.catalog.delete_track(&track.track_id)?;
            removed += 1;
        }

        if removed > 0 {
            info!("Removed {} tracks whose files are gone", removed);
        }
        Ok(removed)
    }
}
