//! Redaction of sensitive spans.
//!
//! Rules are data: a kind label, a pattern and optionally a strategy. The
//! [`Redactor`] applies them in a single pass over the input so that a span
//! claimed by one rule (or an existing reference token) is never rewritten
//! again by a later rule.
//!
//! | Strategy       | Output for `john@example.com`  | Reversible |
//! |----------------|--------------------------------|------------|
//! | `pseudonymize` | `<EMAIL:hash12>`               | yes        |
//! | `mask`         | `************.com`             | no         |
//! | `generic`      | `<REDACTED:EMAIL>`             | no         |

pub mod error;
pub mod redactor;
pub mod rule;
pub mod token;

pub use error::RedactionError;
pub use redactor::{Extraction, Redactor};
pub use rule::{RedactionRule, RedactionStrategy, RuleSet, RuleSpec};
