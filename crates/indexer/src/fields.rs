//! Coercion of raw tag values into storage-safe defaults: absent numbers
//! become 0, absent text becomes the empty string, lists are stored in
//! their delimited encoding.

use crate::delimiter;

pub fn number_field<T: Copy + Default>(value: Option<T>) -> T {
    value.unwrap_or_default()
}

pub fn text_field(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

pub fn multi_text_field(values: &[String]) -> String {
    delimiter::encode_list(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_default_to_zero() {
        assert_eq!(number_field::<u32>(None), 0);
        assert_eq!(number_field(Some(7u32)), 7);
    }

    #[test]
    fn text_is_trimmed() {
        assert_eq!(text_field(None), "");
        assert_eq!(text_field(Some("  Album X  ")), "Album X");
    }

    #[test]
    fn lists_are_delimiter_encoded() {
        assert_eq!(multi_text_field(&[]), "");
        assert_eq!(
            multi_text_field(&["a".to_string(), "b".to_string()]),
            ";a;;b;"
        );
    }
}
