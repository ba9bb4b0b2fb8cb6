//! Prompt templates for the planning and execution stages

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// Planning prompt for a (pre-redacted) user request.
    ///
    /// `tools_description` is the capability registry rendering; it is left
    /// out when no tools are available.
    pub fn planning(user_request: &str, tools_description: Option<&str>) -> String {
        let mut prompt = format!(
            r#"You are ShardGuard. Your task is to analyze user prompts and break them down into a list of subtasks.

IMPORTANT: Replace all sensitive and private information with reference placeholders, then map these references to the original values. This includes:
- Personal names, usernames, passwords → [USERNAME], [PASSWORD], [NAME]
- IP addresses, URLs, server names → [IP_ADDRESS], [URL], [SERVER_NAME]
- File paths, database names → [FILE_PATH], [DATABASE_NAME]
- Any specific identifiers or credentials → [ID], [TOKEN], [KEY]
- Timestamps, dates, and specific values → [TIMESTAMP], [DATE], [VALUE]
Tokens of the form <KIND:0123456789ab> are already redacted. Copy them unchanged and do not add them to opaque_values.

USER_PROMPT:
{user_request}
END.

Break down this prompt into subtasks and replace sensitive information with reference placeholders.

Respond with a JSON document in the following format:
{{
  "original_prompt": "The full original user prompt with sensitive data replaced by reference placeholders like [USERNAME], [PASSWORD], etc.",
  "sub_prompts": [
    {{
      "id": 1,
      "content": "Description of the subtask with sensitive data replaced by reference placeholders",
      "opaque_values": {{
        "[REFERENCE_NAME]": "original_sensitive_value"
      }},
      "suggested_tools": ["server-name.tool_name"]
    }}
  ]
}}"#
        );

        if let Some(tools) = tools_description {
            prompt.push_str("\n\n");
            prompt.push_str(tools);
        }
        prompt
    }

    /// Fixed instruction heading every execution prompt.
    pub fn execution_system() -> &'static str {
        r#"You are the Execution LLM inside ShardGuard.
Use ONLY the tools listed under "Allowed tools". Never invent other tools.
Output ONLY a JSON array of tool intents. No text, no code fences.
Each item: {"server": "...", "tool": "...", "args": { ...optional... }}
Do not include secrets or credentials. Where an argument refers to a placeholder from the task
such as [FILE_PATH] or <EMAIL:0123456789ab>, pass the placeholder exactly as written."#
    }

    /// Execution prompt for one subtask.
    ///
    /// Contains only the subtask's own content and tool list; nothing about
    /// the rest of the plan.
    pub fn execution(content: &str, suggested_tools: &[String]) -> String {
        let tools = serde_json::to_string(suggested_tools).unwrap_or_else(|_| "[]".to_string());
        format!(
            "{}\n\nTask:\n{}\n\nAllowed tools (server.tool):\n{}\n\nReturn ONLY a JSON array (no prose). Return [] if no tool is needed.",
            Self::execution_system(),
            content,
            tools
        )
    }
}
