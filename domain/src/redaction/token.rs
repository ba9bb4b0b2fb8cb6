//! Shapes of the tokens the redactor emits.

use regex::Regex;
use std::sync::LazyLock;

/// Pattern source for `<KIND:hash12>` tokens.
pub const PSEUDONYM_PATTERN: &str = r"<[A-Z][A-Z0-9_-]*:[0-9a-f]{12}>";

/// `<KIND:hash12>`, reversible.
pub static PSEUDONYM_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PSEUDONYM_PATTERN).expect("Invalid regex"));

/// `<REDACTED:KIND>`, irreversible.
pub static GENERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<REDACTED:[A-Z][A-Z0-9_-]*>").expect("Invalid regex"));

/// Byte ranges of tokens already present in `text`.
pub fn token_spans(text: &str) -> Vec<(usize, usize)> {
    PSEUDONYM_TOKEN
        .find_iter(text)
        .chain(GENERIC_TOKEN.find_iter(text))
        .map(|m| (m.start(), m.end()))
        .collect()
}
