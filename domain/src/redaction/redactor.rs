//! Redactor

use super::rule::{RedactionRule, RedactionStrategy, RuleSet};
use super::token::token_spans;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Default number of trailing characters left visible by the mask strategy.
pub const DEFAULT_MASK_KEEP: usize = 4;

const HASH_LEN: usize = 12;

/// Result of [`Redactor::extract`]: the rewritten text and the tokens that
/// now stand in for the original substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub references: BTreeMap<String, String>,
}

/// Pattern-driven detector and replacer of sensitive spans.
///
/// The pseudonym map lives for the lifetime of the instance and is shared
/// between concurrent callers behind a mutex, so the same value always maps
/// to the same token.
#[derive(Debug)]
pub struct Redactor {
    rules: RuleSet,
    strategy: RedactionStrategy,
    mask_keep: usize,
    pseudonyms: Mutex<HashMap<String, String>>,
}

struct Hit<'r> {
    start: usize,
    end: usize,
    rule: &'r RedactionRule,
}

impl Redactor {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            strategy: RedactionStrategy::default(),
            mask_keep: DEFAULT_MASK_KEEP,
            pseudonyms: Mutex::new(HashMap::new()),
        }
    }

    /// Strategy for rules that do not name their own.
    pub fn with_strategy(mut self, strategy: RedactionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_mask_keep(mut self, mask_keep: usize) -> Self {
        self.mask_keep = mask_keep;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn strategy(&self) -> RedactionStrategy {
        self.strategy
    }

    /// Replace every sensitive span using each rule's strategy.
    pub fn redact(&self, text: &str) -> String {
        self.rewrite(text, |rule, value| {
            let strategy = rule.strategy().unwrap_or(self.strategy);
            (self.apply(strategy, rule.kind(), value), None)
        })
        .text
    }

    /// Replace every sensitive span with a pseudonym and report the mapping.
    ///
    /// Always pseudonymizes regardless of configured strategy, since the
    /// caller needs to resolve tokens back to values later.
    pub fn extract(&self, text: &str) -> Extraction {
        self.rewrite(text, |rule, value| {
            let token = self.pseudonymize(rule.kind(), value);
            (token.clone(), Some(token))
        })
    }

    /// Deterministic `<KIND:hash12>` token for a value.
    pub fn pseudonymize(&self, kind: &str, value: &str) -> String {
        let kind = kind.to_ascii_uppercase();
        let key = format!("{kind}|{value}");
        let mut map = self
            .pseudonyms
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(key)
            .or_insert_with(|| {
                let digest = format!("{:x}", Sha256::digest(value.as_bytes()));
                format!("<{kind}:{}>", &digest[..HASH_LEN])
            })
            .clone()
    }

    /// Asterisks except the last `mask_keep` characters; values no longer
    /// than `mask_keep` are masked entirely.
    pub fn mask(&self, value: &str) -> String {
        let len = value.chars().count();
        if len <= self.mask_keep {
            return "*".repeat(len);
        }
        let hidden = len - self.mask_keep;
        let tail: String = value.chars().skip(hidden).collect();
        format!("{}{}", "*".repeat(hidden), tail)
    }

    pub fn generic(kind: &str) -> String {
        format!("<REDACTED:{}>", kind.to_ascii_uppercase())
    }

    fn apply(&self, strategy: RedactionStrategy, kind: &str, value: &str) -> String {
        match strategy {
            RedactionStrategy::Pseudonymize => self.pseudonymize(kind, value),
            RedactionStrategy::Mask => self.mask(value),
            RedactionStrategy::Generic => Self::generic(kind),
        }
    }

    /// Collect non-overlapping hits in rule order, skipping spans that are
    /// already tokens.
    fn hits<'r>(&'r self, text: &str) -> Vec<Hit<'r>> {
        let mut claimed = token_spans(text);
        let mut hits = Vec::new();
        for rule in self.rules.rules() {
            for m in rule.pattern().find_iter(text) {
                if m.start() == m.end() {
                    continue;
                }
                let overlaps = claimed
                    .iter()
                    .any(|&(start, end)| m.start() < end && start < m.end());
                if overlaps {
                    continue;
                }
                claimed.push((m.start(), m.end()));
                hits.push(Hit {
                    start: m.start(),
                    end: m.end(),
                    rule,
                });
            }
        }
        hits.sort_by_key(|hit| hit.start);
        hits
    }

    fn rewrite<F>(&self, text: &str, mut replace: F) -> Extraction
    where
        F: FnMut(&RedactionRule, &str) -> (String, Option<String>),
    {
        let mut out = String::with_capacity(text.len());
        let mut references = BTreeMap::new();
        let mut cursor = 0;
        for hit in self.hits(text) {
            let value = &text[hit.start..hit.end];
            let (replacement, reference) = replace(hit.rule, value);
            out.push_str(&text[cursor..hit.start]);
            out.push_str(&replacement);
            if let Some(token) = reference {
                references.insert(token, value.to_string());
            }
            cursor = hit.end;
        }
        out.push_str(&text[cursor..]);
        Extraction {
            text: out,
            references,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redaction::rule::RuleSpec;

    fn rules() -> RuleSet {
        RuleSet::compile(&[
            RuleSpec::new("email", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"),
            RuleSpec::new("ssn", r"\b\d{3}-\d{2}-\d{4}\b"),
            RuleSpec::new("card", r"\b\d{16}\b")
                .with_kind("credit_card")
                .with_strategy("mask"),
            RuleSpec::new("phone", r"\+?\d[\d -]{7,}\d"),
        ])
        .unwrap()
    }

    #[test]
    fn test_no_sensitive_spans_is_identity() {
        let redactor = Redactor::new(rules());
        let text = "Summarise the quarterly report for the team.";
        assert_eq!(redactor.redact(text), text);
        assert_eq!(redactor.extract(text).references.len(), 0);
    }

    #[test]
    fn test_pseudonymize_email() {
        let redactor = Redactor::new(rules());
        let out = redactor.redact("Send an email to john@example.com about the meeting");
        assert!(!out.contains("john@example.com"));
        assert!(out.starts_with("Send an email to <EMAIL:"));
        assert!(out.ends_with("> about the meeting"));
    }

    #[test]
    fn test_pseudonym_is_stable_across_calls() {
        let redactor = Redactor::new(rules());
        let first = redactor.pseudonymize("email", "a@b.io");
        let second = redactor.pseudonymize("EMAIL", "a@b.io");
        assert_eq!(first, second);
        assert_eq!(first.len(), "<EMAIL:>".len() + HASH_LEN);

        let a = redactor.redact("to a@b.io");
        let b = redactor.redact("cc a@b.io please");
        assert_eq!(
            a.trim_start_matches("to "),
            b.trim_start_matches("cc ").trim_end_matches(" please")
        );
    }

    #[test]
    fn test_pseudonym_uses_sha256_prefix() {
        let redactor = Redactor::new(rules());
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(redactor.pseudonymize("secret", "abc"), "<SECRET:ba7816bf8f01>");
    }

    #[test]
    fn test_mask_keeps_tail() {
        let redactor = Redactor::new(rules());
        assert_eq!(redactor.mask("4111111111115678"), "************5678");
        assert_eq!(redactor.mask("1234"), "****");
        assert_eq!(redactor.mask("12"), "**");
        assert_eq!(redactor.mask(""), "");
    }

    #[test]
    fn test_mask_length_and_suffix_property() {
        let redactor = Redactor::new(rules()).with_mask_keep(3);
        for value in ["abcdefgh", "héllo wörld", "xyz1", "p@ssw0rd!"] {
            let masked = redactor.mask(value);
            let len = value.chars().count();
            assert_eq!(masked.chars().count(), len);
            let keep = 3.min(len);
            let tail: String = value.chars().skip(len - keep).collect();
            assert!(masked.ends_with(&tail));
            assert!(masked.chars().take(len - keep).all(|c| c == '*'));
        }
    }

    #[test]
    fn test_rule_strategy_overrides_default() {
        let redactor = Redactor::new(rules()).with_strategy(RedactionStrategy::Generic);
        let out = redactor.redact("card 4111111111115678 mail x@y.org");
        assert_eq!(out, "card ************5678 mail <REDACTED:EMAIL>");
    }

    #[test]
    fn test_earlier_rule_wins_overlap() {
        let redactor = Redactor::new(rules()).with_strategy(RedactionStrategy::Generic);
        // "123-45-6789" is also a phone match; ssn is listed first.
        assert_eq!(redactor.redact("SSN 123-45-6789"), "SSN <REDACTED:SSN>");
    }

    #[test]
    fn test_existing_tokens_are_not_rewritten() {
        let redactor = Redactor::new(rules());
        let token = redactor.pseudonymize("email", "john@example.com");
        let once = redactor.redact("mail john@example.com now");
        assert_eq!(once, format!("mail {token} now"));
        assert_eq!(redactor.redact(&once), once);
    }

    #[test]
    fn test_extract_always_pseudonymizes() {
        let redactor = Redactor::new(rules()).with_strategy(RedactionStrategy::Mask);
        let extraction = redactor.extract("card 4111111111115678 for bob@corp.example");
        assert_eq!(extraction.references.len(), 2);
        for (token, value) in &extraction.references {
            assert!(extraction.text.contains(token.as_str()));
            assert!(!extraction.text.contains(value.as_str()));
        }
        assert!(extraction.references.values().any(|v| v == "4111111111115678"));
        assert!(
            extraction
                .references
                .keys()
                .any(|t| t.starts_with("<CREDIT_CARD:"))
        );
    }
}
