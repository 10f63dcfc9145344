//! End-to-end reconciliation scenarios against a real catalog store and
//! real directories; only the tag reader is substituted.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use catalog::{Catalog, CatalogStore};
use common::{safe_path, Folder, FolderTrack, NeedsIndexing, RemovedTrack, Track};
use indexer::add::TrackAdder;
use indexer::collection::{CollectionIndexer, IndexingRequest};
use indexer::external::{
    DirectoryWalker, FileStat, FsFileStat, NoopArtworkIndexer, ProgressEvent, ProgressSink,
    TagReader, WalkdirWalker,
};
use indexer::fill::TrackFiller;
use indexer::outdated::CollectionChecker;
use indexer::remove::TrackRemover;
use indexer::update::TrackUpdater;
use indexer::verify::TrackVerifier;
use metadata::{MetadataError, TagInfo};

struct FakeTagReader {
    by_name: HashMap<String, TagInfo>,
    fail: HashSet<String>,
    reads: AtomicUsize,
}

impl FakeTagReader {
    fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            fail: HashSet::new(),
            reads: AtomicUsize::new(0),
        }
    }

    fn with_tags(mut self, name: &str, info: TagInfo) -> Self {
        self.by_name.insert(name.to_string(), info);
        self
    }

    fn failing_on(mut self, name: &str) -> Self {
        self.fail.insert(name.to_string());
        self
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl TagReader for FakeTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagInfo, MetadataError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.fail.contains(&name) {
            return Err(MetadataError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "corrupt header",
            )));
        }
        Ok(self.by_name.get(&name).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count_updating(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == ProgressEvent::UpdatingTracks)
            .count()
    }
}

impl ProgressSink for CollectingSink {
    fn send(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct FailingWalker;

impl DirectoryWalker for FailingWalker {
    fn list_indexable_paths(
        &self,
        _folders: &[Folder],
    ) -> io::Result<Vec<common::IndexablePath>> {
        Err(io::Error::new(io::ErrorKind::Other, "walk failed"))
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    music: PathBuf,
    store: Arc<CatalogStore>,
    folder: Folder,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let music = dir.path().join("music");
    fs::create_dir_all(&music).expect("music dir");
    let store = CatalogStore::open(&dir.path().join("catalog.redb")).expect("open catalog");
    store.init_tables().expect("init catalog");
    let folder = Folder::new(&music.to_string_lossy());
    store.add_folder(&folder).expect("add folder");
    Harness {
        _dir: dir,
        music,
        store: Arc::new(store),
        folder,
    }
}

impl Harness {
    fn catalog(&self) -> Arc<dyn Catalog> {
        self.store.clone()
    }

    fn write_audio(&self, name: &str) -> String {
        let path = self.music.join(name);
        fs::write(&path, b"not really audio but good enough to stat").expect("write file");
        path.to_string_lossy().to_string()
    }

    /// Catalogs a track as the adder would have left it: fully indexed,
    /// with size and modified ticks matching the file on disk.
    fn catalog_synced_track(&self, path: &str) -> Track {
        let stat = FsFileStat;
        let mut track = Track::new(path);
        track.needs_indexing = NeedsIndexing::Done;
        track.indexing_success = true;
        track.file_size = stat.size_of(path).expect("stat size");
        track.date_file_modified = stat.modified_ticks(path).expect("stat modified");
        self.store.add_track(&track).expect("add track");
        self.store
            .add_folder_track(&FolderTrack {
                folder_id: self.folder.folder_id.clone(),
                track_id: track.track_id.clone(),
            })
            .expect("add edge");
        track
    }

    fn adder(&self, reader: Arc<FakeTagReader>, sink: Arc<CollectingSink>) -> TrackAdder {
        let filler = Arc::new(TrackFiller::new(reader, Arc::new(FsFileStat)));
        TrackAdder::new(self.catalog(), Arc::new(WalkdirWalker), filler, sink)
    }

    fn updater(&self, reader: Arc<FakeTagReader>, sink: Arc<CollectingSink>) -> TrackUpdater {
        let filler = Arc::new(TrackFiller::new(reader, Arc::new(FsFileStat)));
        TrackUpdater::new(
            self.catalog(),
            filler,
            TrackVerifier::new(Arc::new(FsFileStat)),
            sink,
        )
    }

    fn indexer(&self, reader: Arc<FakeTagReader>, sink: Arc<CollectingSink>) -> CollectionIndexer {
        CollectionIndexer::new(
            self.catalog(),
            reader,
            Arc::new(FsFileStat),
            Arc::new(WalkdirWalker),
            Arc::new(NoopArtworkIndexer),
            sink,
        )
    }
}

fn song_tag(title: &str) -> TagInfo {
    TagInfo {
        artists: vec!["Artist A".to_string()],
        album: Some("Album X".to_string()),
        title: Some(title.to_string()),
        ..TagInfo::default()
    }
}

#[test]
fn adder_inserts_only_new_tracks() {
    let h = harness();
    let path_a = h.write_audio("a.mp3");
    let path_b = h.write_audio("b.mp3");
    h.catalog_synced_track(&path_a);
    let before = h
        .store
        .track_by_path(&safe_path(&path_a))
        .unwrap()
        .expect("a cataloged");

    let reader = Arc::new(FakeTagReader::new().with_tags("b.mp3", song_tag("Song B")));
    let sink = Arc::new(CollectingSink::default());
    let added = h
        .adder(reader, sink.clone())
        .add_tracks_that_are_new(false)
        .unwrap();

    assert_eq!(added, 1);
    assert_eq!(h.store.count_tracks().unwrap(), 2);

    let track_b = h
        .store
        .track_by_path(&safe_path(&path_b))
        .unwrap()
        .expect("b cataloged");
    assert!(track_b.indexing_success);
    assert_eq!(track_b.track_title, "Song B");

    let edges = h.store.list_folder_tracks().unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges.contains(&FolderTrack {
        folder_id: h.folder.folder_id.clone(),
        track_id: track_b.track_id.clone(),
    }));

    // The already-cataloged track is untouched.
    let after = h
        .store
        .track_by_path(&safe_path(&path_a))
        .unwrap()
        .expect("a still cataloged");
    assert_eq!(before, after);

    // Fewer than twenty additions still report once at the end.
    assert_eq!(
        sink.events(),
        vec![ProgressEvent::AddedTracks {
            count: 1,
            percent: 100,
        }]
    );
}

#[test]
fn tombstoned_paths_respect_refresh_policy() {
    let h = harness();
    let path_c = h.write_audio("c.mp3");
    h.store
        .add_removed_track(&RemovedTrack {
            path: path_c.clone(),
            date_removed: 1,
        })
        .unwrap();

    let reader = Arc::new(FakeTagReader::new());
    let sink = Arc::new(CollectingSink::default());
    let adder = h.adder(reader, sink);

    assert_eq!(adder.add_tracks_that_are_new(true).unwrap(), 0);
    assert_eq!(h.store.count_tracks().unwrap(), 0);

    assert_eq!(adder.add_tracks_that_are_new(false).unwrap(), 1);
    assert!(h
        .store
        .track_by_path(&safe_path(&path_c))
        .unwrap()
        .is_some());
}

#[test]
fn one_corrupt_file_does_not_abort_the_batch() {
    let h = harness();
    let path_bad = h.write_audio("bad.mp3");
    h.write_audio("good.mp3");

    let reader = Arc::new(
        FakeTagReader::new()
            .with_tags("good.mp3", song_tag("Good"))
            .failing_on("bad.mp3"),
    );
    let sink = Arc::new(CollectingSink::default());
    let added = h
        .adder(reader, sink)
        .add_tracks_that_are_new(false)
        .unwrap();

    assert_eq!(added, 2);
    let bad = h
        .store
        .track_by_path(&safe_path(&path_bad))
        .unwrap()
        .expect("bad track still added");
    assert!(!bad.indexing_success);
    assert!(bad.indexing_failure_reason.contains("corrupt header"));
    // Left needing indexing, so the updater retries it next run.
    assert!(bad.needs_indexing.is_needed());
}

#[test]
fn updater_refills_zero_size_track_exactly_once() {
    let h = harness();
    let path_a = h.write_audio("a.mp3");
    let path_b = h.write_audio("b.mp3");

    // a looks never-filled (zero size); b is fully in sync.
    let mut stale = Track::new(&path_a);
    stale.needs_indexing = NeedsIndexing::Done;
    h.store.add_track(&stale).unwrap();
    h.catalog_synced_track(&path_b);

    let reader = Arc::new(FakeTagReader::new().with_tags("a.mp3", song_tag("Song A")));
    let sink = Arc::new(CollectingSink::default());
    let updated = h
        .updater(reader.clone(), sink.clone())
        .update_tracks_that_are_out_of_date()
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(reader.reads(), 1);
    assert_eq!(sink.count_updating(), 1);

    let refilled = h
        .store
        .track_by_path(&safe_path(&path_a))
        .unwrap()
        .expect("a refilled");
    assert!(refilled.indexing_success);
    assert!(refilled.file_size > 0);
    assert_eq!(refilled.track_title, "Song A");
}

#[test]
fn updating_notification_is_sent_once_for_many_stale_tracks() {
    let h = harness();
    for name in ["a.mp3", "b.mp3", "c.mp3"] {
        let path = h.write_audio(name);
        let mut track = Track::new(&path);
        track.needs_indexing = NeedsIndexing::Needed;
        h.store.add_track(&track).unwrap();
    }

    let reader = Arc::new(FakeTagReader::new());
    let sink = Arc::new(CollectingSink::default());
    let updated = h
        .updater(reader, sink.clone())
        .update_tracks_that_are_out_of_date()
        .unwrap();

    assert_eq!(updated, 3);
    assert_eq!(sink.count_updating(), 1);
}

#[test]
fn remover_drops_tracks_of_unconfigured_folders() {
    let h = harness();
    let path_kept = h.write_audio("kept.mp3");
    h.catalog_synced_track(&path_kept);

    let orphan = Track::new(&h.write_audio("orphan.mp3"));
    h.store.add_track(&orphan).unwrap();
    h.store
        .add_folder_track(&FolderTrack {
            folder_id: "gone-folder".to_string(),
            track_id: orphan.track_id.clone(),
        })
        .unwrap();

    let remover = TrackRemover::new(h.catalog(), Arc::new(FsFileStat));
    let removed = remover.remove_tracks_that_do_not_belong_to_folders().unwrap();

    assert_eq!(removed, 1);
    assert_eq!(h.store.count_tracks().unwrap(), 1);
    let edges = h.store.list_folder_tracks().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].folder_id, h.folder.folder_id);
}

#[test]
fn remover_tombstones_tracks_whose_files_vanished() {
    let h = harness();
    let path_kept = h.write_audio("kept.mp3");
    h.catalog_synced_track(&path_kept);
    let path_gone = h.write_audio("gone.mp3");
    let track_gone = h.catalog_synced_track(&path_gone);
    fs::remove_file(&path_gone).unwrap();

    let remover = TrackRemover::new(h.catalog(), Arc::new(FsFileStat));
    let removed = remover.remove_tracks_that_are_not_found_on_disk().unwrap();

    assert_eq!(removed, 1);
    assert_eq!(h.store.count_tracks().unwrap(), 1);
    assert!(h
        .store
        .list_removed_paths()
        .unwrap()
        .contains(&safe_path(&path_gone)));
    assert!(h
        .store
        .list_folder_tracks()
        .unwrap()
        .iter()
        .all(|edge| edge.track_id != track_gone.track_id));
}

#[test]
fn checker_fails_closed_when_the_walk_fails() {
    let h = harness();
    h.write_audio("a.mp3");
    let checker = CollectionChecker::new(h.catalog(), Arc::new(FailingWalker));
    assert!(!checker.is_outdated());
}

#[test]
fn single_file_collections_never_trip_the_modified_signal() {
    let h = harness();
    let path_a = h.write_audio("a.mp3");

    // Stored modified ticks of 0 would normally lag the file, but with a
    // single discovered path the on-disk maximum is defined as 0.
    let mut track = Track::new(&path_a);
    track.needs_indexing = NeedsIndexing::Done;
    track.file_size = 1;
    h.store.add_track(&track).unwrap();

    let checker = CollectionChecker::new(h.catalog(), Arc::new(WalkdirWalker));
    assert!(!checker.is_outdated());

    // A second file restores the signal.
    let path_b = h.write_audio("b.mp3");
    let mut other = Track::new(&path_b);
    other.needs_indexing = NeedsIndexing::Done;
    other.file_size = 1;
    h.store.add_track(&other).unwrap();
    assert!(checker.is_outdated());
}

#[test]
fn full_reconciliation_converges_and_honors_tombstone_policy() {
    let h = harness();
    let _path_a = h.write_audio("a.mp3");
    let path_b = h.write_audio("b.mp3");

    let reader = Arc::new(
        FakeTagReader::new()
            .with_tags("a.mp3", song_tag("Song A"))
            .with_tags("b.mp3", song_tag("Song B")),
    );
    let sink = Arc::new(CollectingSink::default());
    let collection = h.indexer(reader, sink.clone());
    let request = IndexingRequest::default();

    let summary = collection
        .index_collection_if_outdated(&request)
        .unwrap()
        .expect("first run reconciles");
    assert_eq!(summary.added, 2);
    assert_eq!(summary.removed, 0);

    let events = sink.events();
    assert_eq!(events.first(), Some(&ProgressEvent::IndexingStarted));
    assert_eq!(events.get(1), Some(&ProgressEvent::RemovingTracks));
    assert!(events.contains(&ProgressEvent::IndexingArtwork));
    assert_eq!(events.last(), Some(&ProgressEvent::IndexingFinished));

    // Nothing changed since; the pre-flight check short-circuits.
    assert!(collection
        .index_collection_if_outdated(&request)
        .unwrap()
        .is_none());

    // Deleting a file gets it tombstoned on the next run.
    fs::remove_file(&path_b).unwrap();
    let summary = collection
        .index_collection_if_outdated(&request)
        .unwrap()
        .expect("removal run");
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.added, 0);
    assert_eq!(h.store.count_tracks().unwrap(), 1);

    // The path reappears: skipped while the policy says so, re-added when
    // it does not.
    h.write_audio("b.mp3");
    let skip = IndexingRequest {
        skip_removed_files_during_refresh: true,
    };
    let summary = collection
        .index_collection_if_outdated(&skip)
        .unwrap()
        .expect("skip run");
    assert_eq!(summary.added, 0);
    assert_eq!(h.store.count_tracks().unwrap(), 1);

    let summary = collection
        .index_collection_if_outdated(&request)
        .unwrap()
        .expect("re-add run");
    assert_eq!(summary.added, 1);
    assert_eq!(h.store.count_tracks().unwrap(), 2);
}
