//! Reference tokens
//!
//! Three shapes stand in for sensitive values:
//!
//! - `[[P1]]` style double-bracket references
//! - `[USERNAME]` style upper-snake placeholders written by the planner, at
//!   least two characters long
//! - `<EMAIL:0123456789ab>` pseudonyms written by the redactor

use crate::redaction::token::PSEUDONYM_PATTERN;
use regex::Regex;
use std::sync::LazyLock;

static REFERENCE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"\[\[[A-Za-z0-9_]+\]\]|\[[A-Z][A-Z0-9_]+\]|{PSEUDONYM_PATTERN}");
    Regex::new(&pattern).expect("Invalid regex")
});

/// Distinct reference tokens in `text`, in order of first appearance.
pub fn find_references(text: &str) -> Vec<&str> {
    let mut found: Vec<&str> = Vec::new();
    for m in REFERENCE_TOKEN.find_iter(text) {
        if !found.contains(&m.as_str()) {
            found.push(m.as_str());
        }
    }
    found
}

/// Whether the whole of `value` is a single reference token.
pub fn is_reference_token(value: &str) -> bool {
    REFERENCE_TOKEN
        .find(value)
        .is_some_and(|m| m.start() == 0 && m.end() == value.len())
}
