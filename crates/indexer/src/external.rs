//! Collaborator boundaries the reconciliation engine depends on. Each
//! component receives these through its constructor; tests substitute
//! in-memory fakes.

use std::io;
use std::path::Path;

use common::{ticks_from, Folder, IndexablePath, Ticks};
use metadata::{MetadataError, TagInfo};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use walkdir::WalkDir;

const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "wav"];

pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagInfo, MetadataError>;
}

/// Production tag reader, backed by the metadata crate.
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagInfo, MetadataError> {
        metadata::read_tags(path)
    }
}

pub trait FileStat: Send + Sync {
    fn size_of(&self, path: &str) -> io::Result<u64>;
    fn modified_ticks(&self, path: &str) -> io::Result<Ticks>;
    fn created_ticks(&self, path: &str) -> io::Result<Ticks>;
    fn exists(&self, path: &str) -> bool;
}

pub struct FsFileStat;

impl FileStat for FsFileStat {
    fn size_of(&self, path: &str) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn modified_ticks(&self, path: &str) -> io::Result<Ticks> {
        Ok(ticks_from(std::fs::metadata(path)?.modified()?))
    }

    fn created_ticks(&self, path: &str) -> io::Result<Ticks> {
        let meta = std::fs::metadata(path)?;
        // Not every filesystem records birth times; modified is the best
        // available stand-in there.
        match meta.created() {
            Ok(created) => Ok(ticks_from(created)),
            Err(_) => Ok(ticks_from(meta.modified()?)),
        }
    }

    fn exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}

pub trait DirectoryWalker: Send + Sync {
    fn list_indexable_paths(&self, folders: &[Folder]) -> io::Result<Vec<IndexablePath>>;
}

/// Walks every configured folder recursively and yields the supported
/// audio files with their modification ticks.
pub struct WalkdirWalker;

impl DirectoryWalker for WalkdirWalker {
    fn list_indexable_paths(&self, folders: &[Folder]) -> io::Result<Vec<IndexablePath>> {
        let mut paths = Vec::new();
        for folder in folders {
            if !folder.show_in_collection {
                continue;
            }
            for entry in WalkDir::new(&folder.path)
                .follow_links(false)
                .into_iter()
                .filter_map(Result::ok)
            {
                if !entry.file_type().is_file() {
                    continue;
                }
                if !is_supported_audio_file(entry.path()) {
                    continue;
                }
                let modified = match entry.metadata() {
                    Ok(meta) => meta.modified().map(ticks_from).unwrap_or(0),
                    Err(_) => 0,
                };
                paths.push(IndexablePath {
                    path: entry.path().to_string_lossy().to_string(),
                    date_modified_ticks: modified,
                    folder_id: folder.folder_id.clone(),
                });
            }
        }
        Ok(paths)
    }
}

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// One-way progress notifications emitted during a run. Serialized with a
/// `type` tag so hosts can forward them over whatever transport they use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    IndexingStarted,
    RemovingTracks,
    UpdatingTracks,
    AddedTracks { count: usize, percent: u32 },
    IndexingArtwork,
    IndexingFinished,
}

/// Fire-and-forget event emission; implementations must never block the
/// indexing run on a consumer.
pub trait ProgressSink: Send + Sync {
    fn send(&self, event: ProgressEvent);
}

/// Forwards events over an unbounded channel. A departed receiver is not
/// an error; progress is best effort.
pub struct ChannelProgress {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

/// Boundary of the artwork-indexing phase that follows a reconciliation
/// run; the engine only hands off to it.
pub trait ArtworkIndexer: Send + Sync {
    fn index_album_artwork(&self);
}

pub struct NoopArtworkIndexer;

impl ArtworkIndexer for NoopArtworkIndexer {
    fn index_album_artwork(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported_audio_file(Path::new("/m/a.mp3")));
        assert!(is_supported_audio_file(Path::new("/m/a.FLAC")));
        assert!(!is_supported_audio_file(Path::new("/m/a.txt")));
        assert!(!is_supported_audio_file(Path::new("/m/noext")));
    }

    #[test]
    fn progress_events_serialize_with_type_tag() {
        let event = ProgressEvent::AddedTracks {
            count: 40,
            percent: 50,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"addedTracks","count":40,"percent":50}"#);
        let json = serde_json::to_string(&ProgressEvent::UpdatingTracks).unwrap();
        assert_eq!(json, r#"{"type":"updatingTracks"}"#);
    }
}
