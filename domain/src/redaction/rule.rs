//! Redaction rules

use super::error::RedactionError;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Transform applied to a detected sensitive span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedactionStrategy {
    /// Deterministic `<KIND:hash12>` token, reversible through the plan.
    #[default]
    Pseudonymize,
    /// Asterisks except the trailing characters.
    Mask,
    /// `<REDACTED:KIND>`.
    Generic,
}

impl RedactionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedactionStrategy::Pseudonymize => "pseudonymize",
            RedactionStrategy::Mask => "mask",
            RedactionStrategy::Generic => "generic",
        }
    }
}

impl fmt::Display for RedactionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedactionStrategy {
    type Err = RedactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pseudonymize" => Ok(RedactionStrategy::Pseudonymize),
            "mask" => Ok(RedactionStrategy::Mask),
            "generic" | "redact" => Ok(RedactionStrategy::Generic),
            _ => Err(RedactionError::UnknownStrategy(s.to_string())),
        }
    }
}

/// `flags` may be written as a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagList {
    One(String),
    Many(Vec<String>),
}

impl Default for FlagList {
    fn default() -> Self {
        FlagList::Many(Vec::new())
    }
}

impl FlagList {
    fn names(&self) -> Vec<&str> {
        match self {
            FlagList::One(flag) => vec![flag.as_str()],
            FlagList::Many(flags) => flags.iter().map(String::as_str).collect(),
        }
    }
}

/// A rule as written in a rule file, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub pattern: String,
    #[serde(default)]
    pub flags: FlagList,
    #[serde(default)]
    pub strategy: Option<String>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            pattern: pattern.into(),
            flags: FlagList::default(),
            strategy: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_flags(mut self, flags: &[&str]) -> Self {
        self.flags = FlagList::Many(flags.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }
}

/// A compiled rule. Immutable once built.
#[derive(Debug, Clone)]
pub struct RedactionRule {
    name: String,
    kind: String,
    pattern: Regex,
    strategy: Option<RedactionStrategy>,
}

impl RedactionRule {
    /// Compile a [`RuleSpec`]. `index` is only used in error messages.
    pub fn compile(index: usize, spec: &RuleSpec) -> Result<Self, RedactionError> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(RedactionError::EmptyField { index, field: "name" });
        }
        if spec.pattern.is_empty() {
            return Err(RedactionError::EmptyField { index, field: "pattern" });
        }

        let kind = spec
            .kind
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(name)
            .to_ascii_uppercase();
        let valid_kind = kind.starts_with(|c: char| c.is_ascii_alphabetic())
            && kind
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_kind {
            return Err(RedactionError::InvalidKind {
                rule: name.to_string(),
                kind,
            });
        }

        let mut builder = RegexBuilder::new(&spec.pattern);
        for flag in spec.flags.names() {
            match flag.trim().to_ascii_uppercase().as_str() {
                "IGNORECASE" | "I" => builder.case_insensitive(true),
                "MULTILINE" | "M" => builder.multi_line(true),
                "VERBOSE" | "X" => builder.ignore_whitespace(true),
                "DOTALL" | "S" => builder.dot_matches_new_line(true),
                _ => {
                    return Err(RedactionError::UnknownFlag {
                        rule: name.to_string(),
                        flag: flag.to_string(),
                    });
                }
            };
        }
        let pattern = builder
            .build()
            .map_err(|e| RedactionError::InvalidPattern {
                rule: name.to_string(),
                message: e.to_string(),
            })?;

        let strategy = spec
            .strategy
            .as_deref()
            .map(RedactionStrategy::from_str)
            .transpose()?;

        Ok(Self {
            name: name.to_string(),
            kind,
            pattern,
            strategy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper-cased kind label used in tokens.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn strategy(&self) -> Option<RedactionStrategy> {
        self.strategy
    }
}

/// Ordered, non-empty list of compiled rules. Earlier rules win overlaps.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<RedactionRule>,
}

impl RuleSet {
    pub fn compile(specs: &[RuleSpec]) -> Result<Self, RedactionError> {
        if specs.is_empty() {
            return Err(RedactionError::EmptyRuleSet);
        }
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let rule = RedactionRule::compile(index, spec)?;
            if !seen.insert(rule.name.clone()) {
                return Err(RedactionError::DuplicateRule(rule.name));
            }
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[RedactionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_defaults_to_uppercased_name() {
        let rule = RedactionRule::compile(0, &RuleSpec::new("email", "x@y")).unwrap();
        assert_eq!(rule.kind(), "EMAIL");
        assert_eq!(rule.strategy(), None);
    }

    #[test]
    fn test_flags_apply() {
        let spec = RuleSpec::new("secret", "^token=\\w+$").with_flags(&["IGNORECASE", "multiline"]);
        let rule = RedactionRule::compile(0, &spec).unwrap();
        assert!(rule.pattern().is_match("first line\nTOKEN=abc"));
    }

    #[test]
    fn test_verbose_flag() {
        let spec = RuleSpec::new("ssn", r"\d{3} - \d{2} - \d{4}  # social security")
            .with_flags(&["VERBOSE"]);
        let rule = RedactionRule::compile(0, &spec).unwrap();
        assert!(rule.pattern().is_match("123-45-6789"));
    }

    #[test]
    fn test_unknown_flag_is_fatal() {
        let spec = RuleSpec::new("email", "x").with_flags(&["UNICODE_PLUS"]);
        assert_eq!(
            RedactionRule::compile(0, &spec).unwrap_err(),
            RedactionError::UnknownFlag {
                rule: "email".to_string(),
                flag: "UNICODE_PLUS".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_pattern_is_fatal() {
        let err = RedactionRule::compile(0, &RuleSpec::new("bad", "(unclosed")).unwrap_err();
        assert!(matches!(err, RedactionError::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_kind_rejected() {
        let spec = RuleSpec::new("card", "\\d+").with_kind("credit card");
        assert!(matches!(
            RedactionRule::compile(0, &spec),
            Err(RedactionError::InvalidKind { .. })
        ));
    }

    #[test]
    fn test_rule_strategy_override() {
        let spec = RuleSpec::new("card", "\\d{16}").with_strategy("mask");
        let rule = RedactionRule::compile(0, &spec).unwrap();
        assert_eq!(rule.strategy(), Some(RedactionStrategy::Mask));

        let bad = RuleSpec::new("card", "\\d{16}").with_strategy("shred");
        assert!(matches!(
            RedactionRule::compile(0, &bad),
            Err(RedactionError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_rule_set_rejects_empty_and_duplicates() {
        assert_eq!(RuleSet::compile(&[]).unwrap_err(), RedactionError::EmptyRuleSet);
        let specs = [RuleSpec::new("a", "x"), RuleSpec::new("a", "y")];
        assert_eq!(
            RuleSet::compile(&specs).unwrap_err(),
            RedactionError::DuplicateRule("a".to_string())
        );
    }

    #[test]
    fn test_flags_accept_single_string() {
        let spec: RuleSpec =
            serde_json::from_str(r#"{"name":"n","pattern":"p","flags":"DOTALL"}"#).unwrap();
        assert_eq!(spec.flags, FlagList::One("DOTALL".to_string()));
        assert!(RedactionRule::compile(0, &spec).is_ok());
    }
}
