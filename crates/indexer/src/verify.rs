//! Decides from stored state whether a track still needs first-time
//! indexing or has gone stale on disk.

use std::io;
use std::sync::Arc;

use common::Track;

use crate::external::FileStat;

pub struct TrackVerifier {
    stat: Arc<dyn FileStat>,
}

impl TrackVerifier {
    pub fn new(stat: Arc<dyn FileStat>) -> Self {
        Self { stat }
    }

    /// A zero stored size also matches a freshly constructed, never-filled
    /// track; the double duty is intentional.
    pub fn is_out_of_date(&self, track: &Track) -> io::Result<bool> {
        if track.file_size == 0 {
            return Ok(true);
        }
        if track.file_size != self.stat.size_of(&track.path)? {
            return Ok(true);
        }
        if track.date_file_modified != self.stat.modified_ticks(&track.path)? {
            return Ok(true);
        }
        Ok(false)
    }

    pub fn needs_indexing(&self, track: &Track) -> bool {
        track.needs_indexing.is_needed()
    }
}
