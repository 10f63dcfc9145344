//! Re-fills catalog entries that still need indexing or have gone stale
//! on disk.

use std::sync::Arc;

use catalog::Catalog;
use tracing::{info, warn};

use crate::external::{ProgressEvent, ProgressSink};
use crate::fill::TrackFiller;
use crate::verify::TrackVerifier;
use crate::IndexingError;

pub struct TrackUpdater {
    catalog: Arc<dyn Catalog>,
    filler: Arc<TrackFiller>,
    verifier: TrackVerifier,
    sink: Arc<dyn ProgressSink>,
}

impl TrackUpdater {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        filler: Arc<TrackFiller>,
        verifier: TrackVerifier,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            catalog,
            filler,
            verifier,
            sink,
        }
    }

    /// The `updatingTracks` notification is sent once per run, when the
    /// first track triggers a refill.
    pub fn update_tracks_that_are_out_of_date(&self) -> Result<usize, IndexingError> {
        let mut updated = 0usize;
        let mut notified = false;

        for mut track in self.catalog.list_tracks()? {
            let refill = if self.verifier.needs_indexing(&track) {
                true
            } else {
                match self.verifier.is_out_of_date(&track) {
                    Ok(out_of_date) => out_of_date,
                    Err(err) => {
                        warn!("Could not verify {}: {}", track.path, err);
                        false
                    }
                }
            };
            if !refill {
                continue;
            }

            if !notified {
                self.sink.send(ProgressEvent::UpdatingTracks);
                notified = true;
            }

            self.filler.fill(&mut track, false);
            self.catalog.update_track(&track)?;
            updated += 1;
        }

        if updated > 0 {
            info!("Updated {} out-of-date tracks", updated);
        }
        Ok(updated)
    }
}
