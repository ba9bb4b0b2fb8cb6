//! Capability registry
//!
//! The registry is the allowlist: a tool name that is not in here never
//! reaches a tool server, whatever the planner or executor says.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// A `server.tool` capability identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CapabilityId {
    pub server: String,
    pub tool: String,
}

impl CapabilityId {
    pub fn new(server: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            tool: tool.into(),
        }
    }

    /// Parse `server.tool`, splitting at the first `.`.
    ///
    /// Server names never contain dots; tool names may.
    pub fn parse(id: &str) -> Result<Self, DomainError> {
        match id.split_once('.') {
            Some((server, tool)) if !server.is_empty() && !tool.is_empty() => {
                Ok(Self::new(server, tool))
            }
            _ => Err(DomainError::InvalidCapability(id.to_string())),
        }
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.server, self.tool)
    }
}

/// A tool server known to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub description: String,
}

/// One (server, tool) pair offered by a tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityEntry {
    pub server: String,
    pub tool: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl CapabilityEntry {
    pub fn new(
        server: impl Into<String>,
        tool: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            tool: tool.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn id(&self) -> CapabilityId {
        CapabilityId::new(&self.server, &self.tool)
    }

    /// Parameter names and descriptions from the input schema, with the
    /// `required` flag. Empty when the schema has no `properties`.
    pub fn parameters(&self) -> Vec<(String, String, bool)> {
        let Some(schema) = &self.input_schema else {
            return Vec::new();
        };
        let required: BTreeSet<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, info)| {
                        let description = info
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or("No description")
                            .to_string();
                        (name.clone(), description, required.contains(name.as_str()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Read-only set of capabilities, populated once per session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityRegistry {
    servers: Vec<ServerInfo>,
    entries: Vec<CapabilityEntry>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_server(&mut self, name: impl Into<String>, description: impl Into<String>) {
        let name = name.into();
        if self.servers.iter().any(|s| s.name == name) {
            return;
        }
        self.servers.push(ServerInfo {
            name,
            description: description.into(),
        });
    }

    /// Register a tool; a later entry for the same `server.tool` replaces
    /// the earlier one.
    pub fn register(&mut self, entry: CapabilityEntry) {
        if !self.servers.iter().any(|s| s.name == entry.server) {
            self.register_server(entry.server.clone(), "MCP Server");
        }
        match self
            .entries
            .iter_mut()
            .find(|e| e.server == entry.server && e.tool == entry.tool)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn with_entry(mut self, entry: CapabilityEntry) -> Self {
        self.register(entry);
        self
    }

    pub fn contains(&self, server: &str, tool: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.server == server && e.tool == tool)
    }

    /// Whether a `server.tool` string names a registered capability.
    pub fn contains_id(&self, id: &str) -> bool {
        CapabilityId::parse(id)
            .map(|id| self.contains(&id.server, &id.tool))
            .unwrap_or(false)
    }

    pub fn get(&self, server: &str, tool: &str) -> Option<&CapabilityEntry> {
        self.entries
            .iter()
            .find(|e| e.server == server && e.tool == tool)
    }

    pub fn entries(&self) -> &[CapabilityEntry] {
        &self.entries
    }

    pub fn servers(&self) -> &[ServerInfo] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Human-readable tool listing appended to the planning prompt.
    pub fn describe(&self) -> String {
        if self.entries.is_empty() {
            return "No MCP tools available.".to_string();
        }

        let mut out = String::from("Available MCP Tools:\n\n");
        for server in &self.servers {
            let tools: Vec<&CapabilityEntry> = self
                .entries
                .iter()
                .filter(|e| e.server == server.name)
                .collect();
            if tools.is_empty() {
                continue;
            }
            out.push_str(&format!("Server: {} - {}\n", server.name, server.description));
            for entry in tools {
                out.push_str(&format!("  • {}: {}\n", entry.id(), entry.description));
                for (name, description, required) in entry.parameters() {
                    let marker = if required { " (required)" } else { "" };
                    out.push_str(&format!("    - {name}: {description}{marker}\n"));
                }
            }
            out.push('\n');
        }
        out.push_str(
            "When suggesting tools for tasks, list them in the sub-task 'suggested_tools' \
             field using the exact 'server.tool' names above.",
        );
        out
    }
}
