//! Redaction rule loading.
//!
//! Reads rule files into [`RuleSpec`](shardguard_domain::RuleSpec)s and
//! builds the configured [`Redactor`](shardguard_domain::Redactor).

mod rules_file;

pub use rules_file::{
    DEFAULT_RULES_YAML, RuleFileError, RuleFileFormat, build_redactor, default_rule_specs,
    load_rule_set, load_rule_specs, parse_rule_specs,
};
