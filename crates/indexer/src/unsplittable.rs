//! Repairs multi-valued tag fields whose upstream splitter treats `/` as a
//! separator, fragmenting names that legitimately contain one ("AC/DC"
//! arrives as "AC", "DC"). Known slash-containing names are re-joined from
//! the fragments; everything else passes through untouched.

use std::collections::HashSet;

const UNSPLITTABLE_NAMES: &[&str] = &["AC/DC", "De/Vision", "Ghost/Light"];

pub fn join_unsplittable_metadata(tokens: &[String]) -> Vec<String> {
    if tokens.len() <= 1 {
        return tokens.to_vec();
    }

    let mut matched_joins: Vec<String> = Vec::new();
    let mut consumed: HashSet<usize> = HashSet::new();

    for start in 0..tokens.len() {
        for end in start + 1..tokens.len() {
            let candidate = tokens[start..=end].join("/");
            if is_unsplittable(&candidate) {
                for index in start..=end {
                    consumed.insert(index);
                }
                matched_joins.push(candidate);
            }
        }
    }

    let mut out: Vec<String> = tokens
        .iter()
        .enumerate()
        .filter(|(index, _)| !consumed.contains(index))
        .map(|(_, token)| token.clone())
        .collect();
    out.extend(matched_joins);
    out
}

fn is_unsplittable(candidate: &str) -> bool {
    UNSPLITTABLE_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn empty_and_single_inputs_pass_through() {
        assert!(join_unsplittable_metadata(&[]).is_empty());
        assert_eq!(
            join_unsplittable_metadata(&list(&["Solo Artist"])),
            list(&["Solo Artist"])
        );
    }

    #[test]
    fn known_fragments_are_rejoined() {
        let out = join_unsplittable_metadata(&list(&["Artist 1", "AC", "DC", "Artist 2"]));
        assert_eq!(out, list(&["Artist 1", "Artist 2", "AC/DC"]));
    }

    #[test]
    fn matching_is_case_insensitive_but_preserves_input_casing() {
        let out = join_unsplittable_metadata(&list(&["ac", "Dc"]));
        assert_eq!(out, list(&["ac/Dc"]));
    }

    #[test]
    fn unknown_joins_consume_nothing() {
        let tokens = list(&["Simon", "Garfunkel"]);
        assert_eq!(join_unsplittable_metadata(&tokens), tokens);
    }

    #[test]
    fn multiple_names_rejoin_independently() {
        let out = join_unsplittable_metadata(&list(&["AC", "DC", "De", "Vision"]));
        assert_eq!(out, list(&["AC/DC", "De/Vision"]));
    }
}
