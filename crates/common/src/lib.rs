use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Ticks = i64;

/// Tri-state indexing flag. `Unknown` (never decided) and `Needed` both
/// mean the track still has to be indexed; only `Done` counts as indexed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeedsIndexing {
    #[default]
    Unknown,
    Needed,
    Done,
}

impl NeedsIndexing {
    pub fn is_needed(self) -> bool {
        !matches!(self, NeedsIndexing::Done)
    }
}

/// One catalog row per indexed audio file. Identity is the file path;
/// `safe_path` is the lower-cased form used for matching on
/// case-insensitive filesystems.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub track_id: String,
    pub path: String,
    pub safe_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub date_file_modified: Ticks,
    pub date_file_created: Ticks,
    pub date_added: Ticks,
    pub date_last_synced: Ticks,
    #[serde(default)]
    pub needs_indexing: NeedsIndexing,
    pub needs_album_artwork_indexing: bool,
    pub indexing_success: bool,
    pub indexing_failure_reason: String,
    pub track_title: String,
    pub artists: String,
    pub genres: String,
    pub album_title: String,
    pub album_artists: String,
    pub album_key: String,
    pub album_key2: String,
    pub album_key3: String,
    pub track_number: u32,
    pub track_count: u32,
    pub disc_number: u32,
    pub disc_count: u32,
    pub year: u32,
    pub duration_ms: u64,
    pub bit_rate: u32,
    pub sample_rate: u32,
    pub mime_type: String,
    pub has_lyrics: bool,
    pub rating: u8,
    #[serde(default)]
    pub play_count: u32,
    #[serde(default)]
    pub skip_count: u32,
    #[serde(default)]
    pub date_last_played: Ticks,
    #[serde(default)]
    pub love: i8,
}

impl Track {
    /// A fresh, never-filled track for a discovered path. `needs_indexing`
    /// starts out `Unknown` so the updater picks it up even if the first
    /// fill attempt fails before reaching it.
    pub fn new(path: &str) -> Self {
        let safe = safe_path(path);
        Self {
            track_id: stable_id(&safe),
            path: path.to_string(),
            safe_path: safe,
            file_name: String::new(),
            file_size: 0,
            date_file_modified: 0,
            date_file_created: 0,
            date_added: 0,
            date_last_synced: 0,
            needs_indexing: NeedsIndexing::Unknown,
            needs_album_artwork_indexing: false,
            indexing_success: false,
            indexing_failure_reason: String::new(),
            track_title: String::new(),
            artists: String::new(),
            genres: String::new(),
            album_title: String::new(),
            album_artists: String::new(),
            album_key: String::new(),
            album_key2: String::new(),
            album_key3: String::new(),
            track_number: 0,
            track_count: 0,
            disc_number: 0,
            disc_count: 0,
            year: 0,
            duration_ms: 0,
            bit_rate: 0,
            sample_rate: 0,
            mime_type: String::new(),
            has_lyrics: false,
            rating: 0,
            play_count: 0,
            skip_count: 0,
            date_last_played: 0,
            love: 0,
        }
    }
}

/// User-configured collection root. Owned by configuration; the indexing
/// core only reads these.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Folder {
    pub folder_id: String,
    pub path: String,
    pub show_in_collection: bool,
}

impl Folder {
    pub fn new(path: &str) -> Self {
        Self {
            folder_id: stable_id(&safe_path(path)),
            path: path.to_string(),
            show_in_collection: true,
        }
    }
}

/// Membership edge between a folder and a track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderTrack {
    pub folder_id: String,
    pub track_id: String,
}

/// Tombstone for a track whose file vanished, so a later reappearance of
/// the same path can be skipped when the refresh policy says so.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemovedTrack {
    pub path: String,
    pub date_removed: Ticks,
}

/// A file discovered on disk, eligible for cataloging. Produced fresh on
/// every run; never persisted.
#[derive(Clone, Debug)]
pub struct IndexablePath {
    pub path: String,
    pub date_modified_ticks: Ticks,
    pub folder_id: String,
}

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// Lower-cased path used for case-insensitive identity matching.
pub fn safe_path(path: &str) -> String {
    path.to_lowercase()
}

pub fn now_ticks() -> Ticks {
    ticks_from(SystemTime::now())
}

pub fn ticks_from(time: SystemTime) -> Ticks {
    match time.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis().min(i64::MAX as u128) as i64,
        Err(_) => 0,
    }
}

pub fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

pub fn parent_dir_of(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|dir| dir.to_string_lossy().to_string())
        .unwrap_or_default()
}
