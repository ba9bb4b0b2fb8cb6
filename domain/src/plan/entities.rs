//! Plan entities

use super::error::PlanParseError;
use super::reference::{find_references, is_reference_token};
use crate::tool::capability::CapabilityRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One decomposed unit of work.
///
/// `opaque_values` maps reference tokens in `content` to the real values.
/// Only the execution gateway ever dereferences it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubPrompt {
    pub id: u32,
    pub content: String,
    #[serde(default)]
    pub opaque_values: BTreeMap<String, String>,
    #[serde(default)]
    pub suggested_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

impl SubPrompt {
    pub fn new(id: u32, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            opaque_values: BTreeMap::new(),
            suggested_tools: Vec::new(),
            output_schema: None,
        }
    }

    pub fn with_opaque_value(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.opaque_values.insert(token.into(), value.into());
        self
    }

    pub fn with_suggested_tool(mut self, tool: impl Into<String>) -> Self {
        self.suggested_tools.push(tool.into());
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// True value for a reference token, if this subtask owns one.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.opaque_values.get(token).map(String::as_str)
    }

    /// Add references discovered by redaction. Entries the planner already
    /// produced are kept.
    pub fn merge_references<I>(&mut self, references: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (token, value) in references {
            self.opaque_values.entry(token).or_insert(value);
        }
    }

    /// Replace opaque values that are themselves reference tokens with the
    /// value they stand for, looked up in `known` first and then here.
    ///
    /// The planner only ever sees redacted text, so it maps its own
    /// placeholders to the pseudonyms it was shown. Chains are followed until
    /// the value is no longer a known token; cycles stop where they repeat.
    pub fn dereference_values(&mut self, known: &BTreeMap<String, String>) {
        let snapshot = self.opaque_values.clone();
        for value in self.opaque_values.values_mut() {
            let mut seen: Vec<String> = Vec::new();
            while let Some(next) = known
                .get(value.as_str())
                .or_else(|| snapshot.get(value.as_str()))
            {
                if seen.contains(value) {
                    break;
                }
                seen.push(value.clone());
                *value = next.clone();
            }
        }
    }

    /// Opaque values that are still a bare reference token.
    pub fn unresolved_values(&self) -> Vec<(&str, &str)> {
        self.opaque_values
            .iter()
            .filter(|(_, value)| is_reference_token(value))
            .map(|(token, value)| (token.as_str(), value.as_str()))
            .collect()
    }

    pub fn suggests(&self, capability: &str) -> bool {
        self.suggested_tools.iter().any(|t| t == capability)
    }

    /// Suggested tools that are not `server.tool` pairs in the registry.
    pub fn unregistered_tools<'a>(&'a self, registry: &CapabilityRegistry) -> Vec<&'a str> {
        self.suggested_tools
            .iter()
            .filter(|tool| !registry.contains_id(tool))
            .map(String::as_str)
            .collect()
    }

    /// Reference tokens in `content` without an entry in `opaque_values`.
    pub fn unmapped_references(&self) -> Vec<&str> {
        find_references(&self.content)
            .into_iter()
            .filter(|token| !self.opaque_values.contains_key(*token))
            .collect()
    }
}

/// Decomposition of one user request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub original_prompt: String,
    pub sub_prompts: Vec<SubPrompt>,
}

impl Plan {
    pub fn new(original_prompt: impl Into<String>) -> Self {
        Self {
            original_prompt: original_prompt.into(),
            sub_prompts: Vec::new(),
        }
    }

    pub fn with_sub_prompt(mut self, sub_prompt: SubPrompt) -> Self {
        self.sub_prompts.push(sub_prompt);
        self
    }

    pub fn sub_prompt(&self, id: u32) -> Option<&SubPrompt> {
        self.sub_prompts.iter().find(|s| s.id == id)
    }

    /// `(sub_prompt id, tool)` for every suggested tool missing from the
    /// registry. Empty when the plan is fully allowed.
    pub fn unregistered_tools(&self, registry: &CapabilityRegistry) -> Vec<(u32, String)> {
        self.sub_prompts
            .iter()
            .flat_map(|sub| {
                sub.unregistered_tools(registry)
                    .into_iter()
                    .map(move |tool| (sub.id, tool.to_string()))
            })
            .collect()
    }

    /// Sub-prompts with no suggested tools at all.
    pub fn sub_prompts_without_tools(&self) -> Vec<u32> {
        self.sub_prompts
            .iter()
            .filter(|s| s.suggested_tools.is_empty())
            .map(|s| s.id)
            .collect()
    }

    /// Enforce that every reference token has a true value.
    ///
    /// Each sub-prompt's tokens must be in its own `opaque_values`. Tokens in
    /// `original_prompt` may be resolved by any sub-prompt or by `known`
    /// (references the orchestrator extracted from the request itself).
    pub fn check_references(&self, known: &BTreeMap<String, String>) -> Result<(), PlanParseError> {
        for sub in &self.sub_prompts {
            if let Some(token) = sub.unmapped_references().first() {
                return Err(PlanParseError::UnmappedReference {
                    location: format!("sub_prompt {}", sub.id),
                    token: token.to_string(),
                });
            }
            if let Some((token, value)) = sub.unresolved_values().first() {
                return Err(PlanParseError::UnmappedReference {
                    location: format!("sub_prompt {} opaque value of {}", sub.id, token),
                    token: value.to_string(),
                });
            }
        }

        let resolvable = |token: &str| {
            known.contains_key(token)
                || self
                    .sub_prompts
                    .iter()
                    .any(|s| s.opaque_values.contains_key(token))
        };
        if let Some(token) = find_references(&self.original_prompt)
            .into_iter()
            .find(|t| !resolvable(*t))
        {
            return Err(PlanParseError::UnmappedReference {
                location: "original_prompt".to_string(),
                token: token.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::capability::CapabilityEntry;

    fn registry() -> CapabilityRegistry {
        CapabilityRegistry::new()
            .with_entry(CapabilityEntry::new("file-server", "read_file", "Read a file"))
    }

    #[test]
    fn test_unregistered_tools() {
        let plan = Plan::new("do things")
            .with_sub_prompt(SubPrompt::new(1, "read").with_suggested_tool("file-server.read_file"))
            .with_sub_prompt(
                SubPrompt::new(2, "launch")
                    .with_suggested_tool("file-server.read_file")
                    .with_suggested_tool("nuke-server.launch"),
            );
        assert_eq!(
            plan.unregistered_tools(&registry()),
            vec![(2, "nuke-server.launch".to_string())]
        );
    }

    #[test]
    fn test_empty_suggested_tools_pass() {
        let plan = Plan::new("think").with_sub_prompt(SubPrompt::new(1, "summarise"));
        assert!(plan.unregistered_tools(&registry()).is_empty());
        assert_eq!(plan.sub_prompts_without_tools(), vec![1]);
    }

    #[test]
    fn test_merge_keeps_planner_values() {
        let mut sub = SubPrompt::new(1, "mail [EMAIL]").with_opaque_value("[EMAIL]", "a@b.io");
        sub.merge_references([
            ("[EMAIL]".to_string(), "other@b.io".to_string()),
            ("<EMAIL:0123456789ab>".to_string(), "c@d.io".to_string()),
        ]);
        assert_eq!(sub.resolve("[EMAIL]"), Some("a@b.io"));
        assert_eq!(sub.resolve("<EMAIL:0123456789ab>"), Some("c@d.io"));
    }

    #[test]
    fn test_check_references_subprompt_scope() {
        let plan = Plan::new("read [FILE_PATH]")
            .with_sub_prompt(
                SubPrompt::new(1, "read [FILE_PATH]")
                    .with_opaque_value("[FILE_PATH]", "/etc/hosts"),
            )
            .with_sub_prompt(SubPrompt::new(2, "print [FILE_PATH]"));
        let err = plan.check_references(&BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            PlanParseError::UnmappedReference {
                location: "sub_prompt 2".to_string(),
                token: "[FILE_PATH]".to_string()
            }
        );
    }

    #[test]
    fn test_check_references_original_prompt_uses_union_and_known() {
        let plan = Plan::new("mail <EMAIL:0123456789ab> the file [FILE_PATH]").with_sub_prompt(
            SubPrompt::new(1, "read [FILE_PATH]").with_opaque_value("[FILE_PATH]", "/tmp/x"),
        );
        assert!(plan.check_references(&BTreeMap::new()).is_err());

        let known = BTreeMap::from([("<EMAIL:0123456789ab>".to_string(), "a@b.io".to_string())]);
        assert!(plan.check_references(&known).is_ok());
    }

    #[test]
    fn test_dereference_values_follows_pseudonyms() {
        let known = BTreeMap::from([(
            "<EMAIL:06a16e8efd01>".to_string(),
            "bob@corp.example".to_string(),
        )]);
        let mut sub = SubPrompt::new(1, "write the report to [RECIPIENT]")
            .with_opaque_value("[RECIPIENT]", "<EMAIL:06a16e8efd01>")
            .with_opaque_value("[[P1]]", "[RECIPIENT]")
            .with_opaque_value("[LIMIT]", "10");

        sub.dereference_values(&known);

        assert_eq!(sub.resolve("[RECIPIENT]"), Some("bob@corp.example"));
        assert_eq!(sub.resolve("[[P1]]"), Some("bob@corp.example"));
        assert_eq!(sub.resolve("[LIMIT]"), Some("10"));
        assert!(sub.unresolved_values().is_empty());
    }

    #[test]
    fn test_dereference_values_stops_on_cycles() {
        let mut sub = SubPrompt::new(1, "use [A_1] and [B_1]")
            .with_opaque_value("[A_1]", "[B_1]")
            .with_opaque_value("[B_1]", "[A_1]");
        sub.dereference_values(&BTreeMap::new());
        assert_eq!(sub.unresolved_values().len(), 2);
    }

    #[test]
    fn test_check_references_rejects_token_valued_opaque_entry() {
        let plan = Plan::new("mail [RECIPIENT]").with_sub_prompt(
            SubPrompt::new(1, "mail [RECIPIENT]")
                .with_opaque_value("[RECIPIENT]", "<EMAIL:ffffffffffff>"),
        );
        let err = plan.check_references(&BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            PlanParseError::UnmappedReference {
                location: "sub_prompt 1 opaque value of [RECIPIENT]".to_string(),
                token: "<EMAIL:ffffffffffff>".to_string()
            }
        );
    }
}
