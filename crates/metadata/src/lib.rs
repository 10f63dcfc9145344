use std::path::Path;

use lofty::error::LoftyError;
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use lofty::tag::ItemValue;

/// Raw tag data for one audio file. Multi-valued fields arrive already
/// split on the tag separators (`;`, `/`, NUL); downstream patching is
/// responsible for re-joining names that legitimately contain a slash.
#[derive(Debug, Default, Clone)]
pub struct TagInfo {
    pub artists: Vec<String>,
    pub album_artists: Vec<String>,
    pub genres: Vec<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub year: Option<u32>,
    pub track_no: Option<u32>,
    pub track_total: Option<u32>,
    pub disc_no: Option<u32>,
    pub disc_total: Option<u32>,
    pub bit_rate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub duration_ms: Option<u64>,
    pub lyrics: Option<String>,
    pub rating_byte: Option<u8>,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

pub fn read_tags(path: &Path) -> Result<TagInfo, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let properties = tagged_file.properties();

    let mut info = TagInfo::default();

    let duration_ms = properties.duration().as_millis();
    if duration_ms > 0 {
        info.duration_ms = Some(duration_ms.min(u128::from(u64::MAX)) as u64);
    }
    info.sample_rate = properties.sample_rate();
    info.bit_rate = properties.audio_bitrate().or(properties.overall_bitrate());

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        info.title = tag.get_string(&ItemKey::TrackTitle).map(|v| v.to_string());
        info.album = tag.get_string(&ItemKey::AlbumTitle).map(|v| v.to_string());
        info.artists = collect_multi_values(tag.get_strings(&ItemKey::TrackArtist));
        info.album_artists = collect_multi_values(tag.get_strings(&ItemKey::AlbumArtist));
        info.genres = tag
            .get_string(&ItemKey::Genre)
            .map(parse_genres)
            .unwrap_or_default();

        let (track_no, track_tail) = tag
            .get_string(&ItemKey::TrackNumber)
            .map(parse_numbered_pair)
            .unwrap_or((None, None));
        info.track_no = track_no;
        info.track_total = tag
            .get_string(&ItemKey::TrackTotal)
            .and_then(parse_u32)
            .or(track_tail);

        let (disc_no, disc_tail) = tag
            .get_string(&ItemKey::DiscNumber)
            .map(parse_numbered_pair)
            .unwrap_or((None, None));
        info.disc_no = disc_no;
        info.disc_total = tag
            .get_string(&ItemKey::DiscTotal)
            .and_then(parse_u32)
            .or(disc_tail);

        info.year = tag.get_string(&ItemKey::Year).and_then(parse_year);
        info.lyrics = tag.get_string(&ItemKey::Lyrics).map(|v| v.to_string());
        info.rating_byte = tag
            .get(&ItemKey::Popularimeter)
            .and_then(|item| parse_popularimeter(item.value()));
    }

    Ok(info)
}

/// Content type for a path, from its extension. Unknown extensions map to
/// the empty string so the normalizer can store them as-is.
pub fn mime_for_path(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_default()
}

fn collect_multi_values<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out = Vec::new();
    for value in values {
        for part in value.split(&[';', '/', '\0'][..]) {
            let trimmed = part.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        }
    }
    out
}

fn parse_genres(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for part in text.split(&[';', ',', '/', '|', '\0'][..]) {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(trimmed.to_string());
    }
    if out.is_empty() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
    }
    out
}

fn parse_u32(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

/// Parses "3" or "3/12" shaped values into (number, total).
fn parse_numbered_pair(text: &str) -> (Option<u32>, Option<u32>) {
    let mut parts = text.splitn(2, '/');
    let number = parts.next().and_then(parse_u32);
    let total = parts.next().and_then(parse_u32);
    (number, total)
}

fn parse_year(text: &str) -> Option<u32> {
    let mut digits = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            if digits.len() == 4 {
                break;
            }
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// POPM carries `email NUL rating counter`; text renditions are a bare
/// number. Out-of-range text values are dropped rather than clamped.
fn parse_popularimeter(value: &ItemValue) -> Option<u8> {
    match value {
        ItemValue::Binary(bytes) => {
            let nul = bytes.iter().position(|b| *b == 0)?;
            bytes.get(nul + 1).copied()
        }
        ItemValue::Text(text) => text.trim().parse::<u8>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_values_split_on_tag_separators() {
        let values = ["Artist 1; Artist 2", "AC/DC"];
        let out = collect_multi_values(values.iter().copied());
        assert_eq!(out, vec!["Artist 1", "Artist 2", "AC", "DC"]);
    }

    #[test]
    fn numbered_pair_accepts_slash_totals() {
        assert_eq!(parse_numbered_pair("3/12"), (Some(3), Some(12)));
        assert_eq!(parse_numbered_pair("7"), (Some(7), None));
        assert_eq!(parse_numbered_pair("x"), (None, None));
    }

    #[test]
    fn year_takes_leading_digits() {
        assert_eq!(parse_year("1999-05-01"), Some(1999));
        assert_eq!(parse_year("about 2001"), Some(2001));
        assert_eq!(parse_year("unknown"), None);
    }

    #[test]
    fn popularimeter_binary_rating() {
        let frame = b"user@example.com\x00\xc4\x00\x00\x00\x07".to_vec();
        assert_eq!(parse_popularimeter(&ItemValue::Binary(frame)), Some(196));
        assert_eq!(
            parse_popularimeter(&ItemValue::Text("255".to_string())),
            Some(255)
        );
        assert_eq!(parse_popularimeter(&ItemValue::Text("260".to_string())), None);
    }

    #[test]
    fn mime_lookup_by_extension() {
        assert_eq!(mime_for_path(Path::new("/music/a.mp3")), "audio/mpeg");
        assert_eq!(mime_for_path(Path::new("/music/a.unknownext")), "");
    }
}
