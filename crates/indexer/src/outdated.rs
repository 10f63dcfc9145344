//! Cheap pre-flight check deciding whether a full reconciliation run is
//! worth starting at all.

use std::sync::Arc;

use catalog::Catalog;
use tracing::{debug, warn};

use crate::external::DirectoryWalker;
use crate::IndexingError;

pub struct CollectionChecker {
    catalog: Arc<dyn Catalog>,
    walker: Arc<dyn DirectoryWalker>,
}

impl CollectionChecker {
    pub fn new(catalog: Arc<dyn Catalog>, walker: Arc<dyn DirectoryWalker>) -> Self {
        Self { catalog, walker }
    }

    /// Any failure during the check is treated as "not outdated" so a
    /// transient I/O error cannot trigger a re-index storm.
    pub fn is_outdated(&self) -> bool {
        match self.check() {
            Ok(outdated) => outdated,
            Err(err) => {
                warn!("Collection outdated check failed, assuming up to date: {}", err);
                false
            }
        }
    }

    fn check(&self) -> Result<bool, IndexingError> {
        let tracks_need_indexing = self.catalog.count_tracks_needing_indexing()? > 0;

        let folders = self.catalog.list_folders()?;
        let paths = self.walker.list_indexable_paths(&folders)?;
        let count_changed = self.catalog.count_tracks()? != paths.len();

        // With zero or one discovered paths the on-disk maximum is defined
        // as 0, which keeps this signal quiet for single-file collections.
        let disk_max = if paths.len() > 1 {
            paths
                .iter()
                .map(|path| path.date_modified_ticks)
                .max()
                .unwrap_or(0)
        } else {
            0
        };
        let last_modified_changed = self.catalog.max_date_file_modified()? < disk_max;

        debug!(
            tracks_need_indexing,
            count_changed, last_modified_changed, "Collection outdated check"
        );
        Ok(tracks_need_indexing || count_changed || last_modified_changed)
    }
}
