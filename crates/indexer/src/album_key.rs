//! Grouping keys used to cluster tracks into albums. A key combines the
//! album title with the artist list through the delimited-list codec so
//! that independent values never collide.

use crate::delimiter;

/// Empty or blank titles produce an empty key; callers treat that as
/// "no album grouping possible".
pub fn generate_album_key(album_title: &str, album_artists: &[String]) -> String {
    if album_title.trim().is_empty() {
        return String::new();
    }

    let mut items = vec![album_title.to_string()];
    if !album_artists.is_empty() {
        items.extend(album_artists.iter().cloned());
    }
    delimiter::encode_list(&items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn blank_title_yields_empty_key() {
        assert_eq!(generate_album_key("", &list(&["Artist"])), "");
        assert_eq!(generate_album_key("   ", &list(&["Artist"])), "");
    }

    #[test]
    fn key_is_stable_and_non_empty() {
        let first = generate_album_key("Album X", &list(&["Art A"]));
        let second = generate_album_key("Album X", &list(&["Art A"]));
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn artists_change_the_key() {
        let with_artist = generate_album_key("Album X", &list(&["Art A"]));
        let title_only = generate_album_key("Album X", &[]);
        assert_ne!(with_artist, title_only);
        assert_eq!(title_only, ";Album X;");
    }
}
