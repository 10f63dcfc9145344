//! Populates a track record from its file's tags. Filling never fails:
//! extraction errors are recorded on the track itself so one unreadable
//! file cannot block the rest of a run.

use std::path::Path;
use std::sync::Arc;

use common::{NeedsIndexing, Track};
use metadata::MetadataError;
use tracing::warn;

use crate::album_key::generate_album_key;
use crate::external::{FileStat, TagReader};
use crate::fields;
use crate::rating;
use crate::unsplittable::join_unsplittable_metadata;

pub struct TrackFiller {
    tags: Arc<dyn TagReader>,
    stat: Arc<dyn FileStat>,
}

impl TrackFiller {
    pub fn new(tags: Arc<dyn TagReader>, stat: Arc<dyn FileStat>) -> Self {
        Self { tags, stat }
    }

    /// Fills `track` from its file. An essential fill stops after the
    /// fields the collection views cannot live without; a full fill also
    /// syncs file dates and the secondary tag fields.
    ///
    /// On failure the track keeps whatever was filled so far, records the
    /// reason, and — deliberately — keeps its previous `needs_indexing`
    /// value so the next run retries it.
    pub fn fill(&self, track: &mut Track, only_essential: bool) {
        if let Err(err) = self.try_fill(track, only_essential) {
            track.indexing_success = false;
            let message = err.to_string();
            track.indexing_failure_reason = if message.is_empty() {
                "Unknown error".to_string()
            } else {
                message
            };
            warn!(
                "Failed to index {}: {}",
                track.path, track.indexing_failure_reason
            );
        }
    }

    fn try_fill(&self, track: &mut Track, only_essential: bool) -> Result<(), FillError> {
        let path = Path::new(&track.path);
        let tag = self.tags.read_tags(path)?;

        let artists = join_unsplittable_metadata(&tag.artists);
        track.artists = fields::multi_text_field(&artists);

        track.rating = rating::popularity_to_star(u32::from(tag.rating_byte.unwrap_or(0)));
        track.file_name = common::file_name_of(&track.path);
        track.duration_ms = fields::number_field(tag.duration_ms);
        track.track_title = fields::text_field(tag.title.as_deref());
        track.track_number = fields::number_field(tag.track_no);
        track.file_size = self.stat.size_of(&track.path)?;

        let album_title = fields::text_field(tag.album.as_deref());
        let album_artists = join_unsplittable_metadata(&tag.album_artists);
        let key_artists = if album_artists.is_empty() {
            &artists
        } else {
            &album_artists
        };
        track.album_key = generate_album_key(&album_title, key_artists);
        track.album_key2 = generate_album_key(&album_title, &[]);
        track.album_key3 = generate_album_key(&common::parent_dir_of(&track.path), &[]);

        if !only_essential {
            let genres = join_unsplittable_metadata(&tag.genres);
            track.genres = fields::multi_text_field(&genres);
            track.album_title = album_title;
            track.album_artists = fields::multi_text_field(&album_artists);
            track.mime_type = metadata::mime_for_path(path);
            track.bit_rate = fields::number_field(tag.bit_rate);
            track.sample_rate = fields::number_field(tag.sample_rate);
            track.track_count = fields::number_field(tag.track_total);
            track.disc_number = fields::number_field(tag.disc_no);
            track.disc_count = fields::number_field(tag.disc_total);
            track.year = fields::number_field(tag.year);
            track.has_lyrics = tag
                .lyrics
                .map(|lyrics| !lyrics.trim().is_empty())
                .unwrap_or(false);

            let now = common::now_ticks();
            track.date_added = now;
            track.date_last_synced = now;
            track.date_file_created = self.stat.created_ticks(&track.path)?;
            track.date_file_modified = self.stat.modified_ticks(&track.path)?;
        }

        track.needs_indexing = NeedsIndexing::Done;
        track.needs_album_artwork_indexing = true;
        track.indexing_success = true;
        track.indexing_failure_reason.clear();
        Ok(())
    }
}

#[derive(Debug)]
enum FillError {
    Metadata(MetadataError),
    Io(std::io::Error),
}

impl std::fmt::Display for FillError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillError::Metadata(err) => write!(f, "{}", err),
            FillError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl From<MetadataError> for FillError {
    fn from(err: MetadataError) -> Self {
        FillError::Metadata(err)
    }
}

impl From<std::io::Error> for FillError {
    fn from(err: std::io::Error) -> Self {
        FillError::Io(err)
    }
}
