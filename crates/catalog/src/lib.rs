use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{Folder, FolderTrack, RemovedTrack, Ticks, Track};
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use serde::{Deserialize, Serialize};
use tracing::info;

const KEY_SEP: char = '\x1f';

const FOLDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("folders");
const TRACKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tracks");
const TRACKS_BY_PATH_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tracks_by_path");
const FOLDER_TRACKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("folder_tracks");
const REMOVED_TRACKS_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("removed_tracks");

/// Catalog-store contract the reconciliation engine depends on. Implemented
/// by the redb-backed [`CatalogStore`] and by in-memory fakes in tests.
pub trait Catalog: Send + Sync {
    fn add_folder(&self, folder: &Folder) -> Result<(), CatalogError>;
    fn list_folders(&self) -> Result<Vec<Folder>, CatalogError>;
    fn remove_folder(&self, folder_id: &str) -> Result<(), CatalogError>;

    fn count_tracks(&self) -> Result<usize, CatalogError>;
    fn count_tracks_needing_indexing(&self) -> Result<usize, CatalogError>;
    fn max_date_file_modified(&self) -> Result<Ticks, CatalogError>;
    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError>;
    fn track_by_path(&self, safe_path: &str) -> Result<Option<Track>, CatalogError>;
    fn add_track(&self, track: &Track) -> Result<(), CatalogError>;
    fn update_track(&self, track: &Track) -> Result<(), CatalogError>;
    /// Deletes the track, its path-index entry and its folder edges.
    fn delete_track(&self, track_id: &str) -> Result<(), CatalogError>;

    fn add_folder_track(&self, edge: &FolderTrack) -> Result<(), CatalogError>;
    fn list_folder_tracks(&self) -> Result<Vec<FolderTrack>, CatalogError>;
    fn delete_folder_track(&self, edge: &FolderTrack) -> Result<(), CatalogError>;

    fn add_removed_track(&self, removed: &RemovedTrack) -> Result<(), CatalogError>;
    fn list_removed_paths(&self) -> Result<Vec<String>, CatalogError>;
}

#[derive(Clone)]
pub struct CatalogStore {
    db: Arc<Database>,
}

impl CatalogStore {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = if path.exists() {
            Database::open(path)?
        } else {
            info!("Creating catalog at {:?}", path);
            Database::create(path)?
        };
        Ok(Self { db: Arc::new(db) })
    }

    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn init_tables(&self) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(FOLDERS_TABLE)?;
            let _ = write_txn.open_table(TRACKS_TABLE)?;
            let _ = write_txn.open_table(TRACKS_BY_PATH_TABLE)?;
            let _ = write_txn.open_table(FOLDER_TRACKS_TABLE)?;
            let _ = write_txn.open_table(REMOVED_TRACKS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn insert_track(&self, track: &Track) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut tracks = write_txn.open_table(TRACKS_TABLE)?;
            let bytes = encode_value(track)?;
            tracks.insert(track.track_id.as_str(), bytes.as_slice())?;

            let mut by_path = write_txn.open_table(TRACKS_BY_PATH_TABLE)?;
            by_path.insert(track.safe_path.as_str(), track.track_id.as_bytes())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl Catalog for CatalogStore {
    fn add_folder(&self, folder: &Folder) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FOLDERS_TABLE)?;
            let bytes = encode_value(folder)?;
            table.insert(folder.folder_id.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_folders(&self) -> Result<Vec<Folder>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(FOLDERS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut folders = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            folders.push(decode_value(entry.1.value())?);
        }
        Ok(folders)
    }

    fn remove_folder(&self, folder_id: &str) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = match write_txn.open_table(FOLDERS_TABLE) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(()),
                Err(err) => return Err(err.into()),
            };
            let _ = table.remove(folder_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn count_tracks(&self) -> Result<usize, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(TRACKS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        Ok(table.len()? as usize)
    }

    fn count_tracks_needing_indexing(&self) -> Result<usize, CatalogError> {
        let mut count = 0usize;
        for track in self.list_tracks()? {
            if track.needs_indexing.is_needed() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn max_date_file_modified(&self) -> Result<Ticks, CatalogError> {
        let mut max = 0;
        for track in self.list_tracks()? {
            max = max.max(track.date_file_modified);
        }
        Ok(max)
    }

    fn list_tracks(&self) -> Result<Vec<Track>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(TRACKS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut tracks = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            tracks.push(decode_value(entry.1.value())?);
        }
        Ok(tracks)
    }

    fn track_by_path(&self, safe_path: &str) -> Result<Option<Track>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let by_path = match read_txn.open_table(TRACKS_BY_PATH_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let track_id = match by_path.get(safe_path)? {
            Some(value) => String::from_utf8_lossy(value.value()).to_string(),
            None => return Ok(None),
        };
        let tracks = read_txn.open_table(TRACKS_TABLE)?;
        let track = match tracks.get(track_id.as_str())? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(track)
    }

    fn add_track(&self, track: &Track) -> Result<(), CatalogError> {
        self.insert_track(track)
    }

    fn update_track(&self, track: &Track) -> Result<(), CatalogError> {
        self.insert_track(track)
    }

    fn delete_track(&self, track_id: &str) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut tracks = match write_txn.open_table(TRACKS_TABLE) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(()),
                Err(err) => return Err(err.into()),
            };
            let removed: Option<Track> = match tracks.remove(track_id)? {
                Some(value) => Some(decode_value(value.value())?),
                None => None,
            };

            if let Some(track) = removed {
                let mut by_path = write_txn.open_table(TRACKS_BY_PATH_TABLE)?;
                let _ = by_path.remove(track.safe_path.as_str())?;
            }

            let mut edges = write_txn.open_table(FOLDER_TRACKS_TABLE)?;
            let mut stale_keys = Vec::new();
            for entry in edges.iter()? {
                let entry = entry?;
                let key = entry.0.value();
                let (_, edge_track_id) = split_key_last(key)?;
                if edge_track_id == track_id {
                    stale_keys.push(key.to_string());
                }
            }
            for key in stale_keys {
                let _ = edges.remove(key.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn add_folder_track(&self, edge: &FolderTrack) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FOLDER_TRACKS_TABLE)?;
            let key = edge_key(&edge.folder_id, &edge.track_id);
            table.insert(key.as_str(), [1u8].as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_folder_tracks(&self) -> Result<Vec<FolderTrack>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(FOLDER_TRACKS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut edges = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let key = entry.0.value();
            let (folder_id, track_id) = split_key_last(key)?;
            edges.push(FolderTrack {
                folder_id: folder_id.to_string(),
                track_id: track_id.to_string(),
            });
        }
        Ok(edges)
    }

    fn delete_folder_track(&self, edge: &FolderTrack) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = match write_txn.open_table(FOLDER_TRACKS_TABLE) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => return Ok(()),
                Err(err) => return Err(err.into()),
            };
            let key = edge_key(&edge.folder_id, &edge.track_id);
            let _ = table.remove(key.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn add_removed_track(&self, removed: &RemovedTrack) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(REMOVED_TRACKS_TABLE)?;
            let bytes = encode_value(removed)?;
            let key = common::safe_path(&removed.path);
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn list_removed_paths(&self) -> Result<Vec<String>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(REMOVED_TRACKS_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut paths = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            paths.push(entry.0.value().to_string());
        }
        Ok(paths)
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
    KeyParse(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "io error: {}", err),
            CatalogError::Redb(err) => write!(f, "db error: {}", err),
            CatalogError::Bincode(err) => write!(f, "bincode error: {}", err),
            CatalogError::KeyParse(value) => write!(f, "key parse error: {}", value),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<redb::Error> for CatalogError {
    fn from(err: redb::Error) -> Self {
        CatalogError::Redb(err)
    }
}

impl From<DatabaseError> for CatalogError {
    fn from(err: DatabaseError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<TableError> for CatalogError {
    fn from(err: TableError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<TransactionError> for CatalogError {
    fn from(err: TransactionError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<CommitError> for CatalogError {
    fn from(err: CommitError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for CatalogError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        CatalogError::Bincode(err)
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, CatalogError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, CatalogError> {
    Ok(bincode::deserialize(bytes)?)
}

fn edge_key(folder_id: &str, track_id: &str) -> String {
    let mut out = String::new();
    out.push_str(folder_id);
    out.push(KEY_SEP);
    out.push_str(track_id);
    out
}

fn split_key_last(value: &str) -> Result<(&str, &str), CatalogError> {
    let idx = value
        .rfind(KEY_SEP)
        .ok_or_else(|| CatalogError::KeyParse(value.to_string()))?;
    let next = idx + KEY_SEP.len_utf8();
    Ok((&value[..idx], &value[next..]))
}
