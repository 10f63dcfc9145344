//! Reversible encoding of a list of strings into one scalar string. Every
//! token is wrapped in the delimiter on both sides, so concatenation stays
//! unambiguous without a separator between tokens: decoding splits on the
//! delimiter and drops the empty segments.

pub const DELIMITER: char = ';';

pub fn encode_list(items: &[String]) -> String {
    let mut out = String::new();
    for item in items {
        for token in item.split(DELIMITER) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            out.push(DELIMITER);
            out.push_str(token);
            out.push(DELIMITER);
        }
    }
    out
}

pub fn decode_list(value: &str) -> Vec<String> {
    value
        .split(DELIMITER)
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn encode_wraps_every_token() {
        assert_eq!(encode_list(&list(&["a", "b"])), ";a;;b;");
        assert_eq!(encode_list(&list(&["only"])), ";only;");
        assert_eq!(encode_list(&[]), "");
    }

    #[test]
    fn decode_inverts_encode() {
        let items = list(&["Album X", "Artist A", "Artist B"]);
        assert_eq!(decode_list(&encode_list(&items)), items);
    }

    #[test]
    fn embedded_delimiters_become_separate_tokens() {
        assert_eq!(encode_list(&list(&["a;b"])), ";a;;b;");
        assert_eq!(decode_list(";a;;b;"), list(&["a", "b"]));
    }

    #[test]
    fn blank_tokens_are_dropped() {
        assert_eq!(encode_list(&list(&[" ", "", "x "])), ";x;");
        assert!(decode_list(";;;").is_empty());
    }
}
