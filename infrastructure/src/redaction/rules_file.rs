//! Redaction rule files (YAML or TOML, chosen by extension).

use crate::config::FileRedactionConfig;
use serde::Deserialize;
use shardguard_domain::{RedactionError, RedactionStrategy, Redactor, RuleSet, RuleSpec};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Rules compiled into the binary, used when no rule file is configured.
pub const DEFAULT_RULES_YAML: &str = include_str!("default_rules.yaml");

#[derive(Error, Debug)]
pub enum RuleFileError {
    #[error("Failed to read rule file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported rule file extension: {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid YAML rule file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML rule file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Rules(#[from] RedactionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFileFormat {
    Yaml,
    Toml,
}

impl RuleFileFormat {
    pub fn from_path(path: &Path) -> Result<Self, RuleFileError> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => Ok(RuleFileFormat::Yaml),
            Some("toml") => Ok(RuleFileFormat::Toml),
            _ => Err(RuleFileError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

pub fn parse_rule_specs(
    content: &str,
    format: RuleFileFormat,
) -> Result<Vec<RuleSpec>, RuleFileError> {
    let file: RuleFile = match format {
        RuleFileFormat::Yaml => serde_yaml::from_str(content)?,
        RuleFileFormat::Toml => toml::from_str(content)?,
    };
    Ok(file.rules)
}

pub fn load_rule_specs(path: &Path) -> Result<Vec<RuleSpec>, RuleFileError> {
    let format = RuleFileFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| RuleFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let specs = parse_rule_specs(&content, format)?;
    debug!("Loaded {} redaction rules from {}", specs.len(), path.display());
    Ok(specs)
}

pub fn default_rule_specs() -> Result<Vec<RuleSpec>, RuleFileError> {
    parse_rule_specs(DEFAULT_RULES_YAML, RuleFileFormat::Yaml)
}

/// Compile the rules from `path`, or the built-in rules when `None`.
///
/// An empty or partly invalid file is an error; there is no fallback to the
/// built-in rules in that case.
pub fn load_rule_set(path: Option<&Path>) -> Result<RuleSet, RuleFileError> {
    let specs = match path {
        Some(path) => load_rule_specs(path)?,
        None => default_rule_specs()?,
    };
    Ok(RuleSet::compile(&specs)?)
}

/// Build the redactor described by the `[redaction]` section.
pub fn build_redactor(config: &FileRedactionConfig) -> Result<Redactor, RuleFileError> {
    let rules = load_rule_set(config.rules_file.as_deref())?;
    let strategy: RedactionStrategy = config.strategy.parse()?;
    info!(
        rules = rules.len(),
        strategy = %strategy,
        source = %config
            .rules_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
        "Redaction rules loaded"
    );
    Ok(Redactor::new(rules)
        .with_strategy(strategy)
        .with_mask_keep(config.mask_keep))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_rules_compile() {
        let rules = load_rule_set(None).unwrap();
        let kinds: Vec<&str> = rules.rules().iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec!["EMAIL", "URL", "CREDIT_CARD", "SSN", "IPV4", "PHONE"]
        );
    }

    #[test]
    fn test_default_rules_redact_common_values() {
        let redactor = Redactor::new(load_rule_set(None).unwrap());
        let cases = [
            ("Send an email to john@example.com now", "<EMAIL:"),
            ("Visit https://example.com/login today", "<URL:"),
            ("CC 4111-1111-1111-5678 on file", "<CREDIT_CARD:"),
            ("SSN 123-45-6789 please", "<SSN:"),
            ("Server at 192.168.1.20 is down", "<IPV4:"),
            ("Call me at +1 555-234-5678", "<PHONE:"),
        ];
        for (input, expected) in cases {
            let out = redactor.redact(input);
            assert!(out.contains(expected), "{input:?} -> {out:?}");
        }
    }

    #[test]
    fn test_load_yaml_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        fs::write(
            &path,
            r#"
rules:
  - name: employee_id
    pattern: 'EMP-\d{5}'
    flags: IGNORECASE
    strategy: generic
"#,
        )
        .unwrap();

        let specs = load_rule_specs(&path).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].strategy.as_deref(), Some("generic"));

        let redactor = Redactor::new(load_rule_set(Some(&path)).unwrap());
        assert_eq!(
            redactor.redact("badge emp-12345"),
            "badge <REDACTED:EMPLOYEE_ID>"
        );
    }

    #[test]
    fn test_load_toml_rule_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        fs::write(
            &path,
            r#"
[[rules]]
name = "ticket"
kind = "TICKET"
pattern = 'T-\d+'
flags = ["MULTILINE"]
"#,
        )
        .unwrap();

        let rules = load_rule_set(Some(&path)).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.rules()[0].kind(), "TICKET");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_rule_specs(Path::new("rules.json")).unwrap_err();
        assert!(matches!(err, RuleFileError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rule_specs(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, RuleFileError::Io { .. }));
    }

    #[test]
    fn test_empty_rule_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yml");
        fs::write(&path, "rules: []\n").unwrap();
        let err = load_rule_set(Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            RuleFileError::Rules(RedactionError::EmptyRuleSet)
        ));
    }

    #[test]
    fn test_unknown_flag_is_fatal() {
        let specs = parse_rule_specs(
            "rules:\n  - name: x\n    pattern: 'x'\n    flags: [UNICODE_PLEASE]\n",
            RuleFileFormat::Yaml,
        )
        .unwrap();
        assert!(matches!(
            RuleSet::compile(&specs),
            Err(RedactionError::UnknownFlag { .. })
        ));
    }

    #[test]
    fn test_build_redactor_applies_strategy() {
        let config = FileRedactionConfig {
            strategy: "mask".to_string(),
            mask_keep: 4,
            ..FileRedactionConfig::default()
        };
        let redactor = build_redactor(&config).unwrap();
        assert_eq!(redactor.redact("SSN 123-45-6789"), "SSN *******6789");
    }

    #[test]
    fn test_build_redactor_unknown_strategy() {
        let config = FileRedactionConfig {
            strategy: "shred".to_string(),
            ..FileRedactionConfig::default()
        };
        assert!(matches!(
            build_redactor(&config),
            Err(RuleFileError::Rules(RedactionError::UnknownStrategy(_)))
        ));
    }
}
