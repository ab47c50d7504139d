//! Validation for directive names and `-c` config keys.

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// Whether `s` is a well-formed Sitix identifier (a `[=name ...]` name or a
/// `-c NAME` config key): starts with a letter or underscore, followed by
/// letters, digits, or underscores.
pub fn is_valid_identifier(s: &str) -> bool {
    pattern().is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_typical_names() {
        assert!(is_valid_identifier("title"));
        assert!(is_valid_identifier("_hidden"));
        assert!(is_valid_identifier("post_1"));
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1title"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier("has.dot"));
    }
}
