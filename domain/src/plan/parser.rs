//! Plan parsing from planner output.
//!
//! The planner is asked for a JSON document but may wrap it in prose or a
//! code fence. Locating the JSON is forgiving; validating its shape is not:
//! any violation is a [`PlanParseError`].

use super::entities::{Plan, SubPrompt};
use super::error::PlanParseError;
use super::output_schema::check_schema;
use crate::util::{balanced_span, strip_code_fence};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

const MAX_PLAN_BYTES: usize = 256 * 1024;

/// Locate the plan JSON object inside planner output.
///
/// 1. The whole (fence-stripped) response, if it is a JSON object.
/// 2. The span from the first `{` to the last `}`.
/// 3. The longest balanced `{...}` span that parses.
pub fn extract_plan_json(response: &str) -> Option<Value> {
    let cleaned = strip_code_fence(response);
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    if let (Some(first), Some(last)) = (cleaned.find('{'), cleaned.rfind('}'))
        && first < last
        && let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&cleaned[first..=last])
    {
        return Some(value);
    }

    cleaned
        .match_indices('{')
        .filter_map(|(start, _)| balanced_span(cleaned, start, MAX_PLAN_BYTES))
        .filter_map(|span| match serde_json::from_str::<Value>(span) {
            Ok(value @ Value::Object(_)) => Some((span.len(), value)),
            _ => None,
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, value)| value)
}

/// Parse planner output into a [`Plan`].
pub fn parse_plan(response: &str) -> Result<Plan, PlanParseError> {
    let json = extract_plan_json(response).ok_or(PlanParseError::NoJson)?;
    parse_plan_json(&json)
}

/// Parse a plan from a JSON value.
///
/// Expected shape:
/// ```json
/// {
///   "original_prompt": "string, non-empty",
///   "sub_prompts": [
///     {
///       "id": 1,
///       "content": "string, non-empty",
///       "opaque_values": {"[TOKEN]": "value"},
///       "suggested_tools": ["server.tool"],
///       "output_schema": { ... }
///     }
///   ]
/// }
/// ```
///
/// `opaque_values`, `suggested_tools` and `output_schema` are optional; a
/// `null` counts as absent.
pub fn parse_plan_json(json: &Value) -> Result<Plan, PlanParseError> {
    let root = json
        .as_object()
        .ok_or_else(|| PlanParseError::invalid("$", "expected a JSON object"))?;

    let original_prompt = required_string(root, "original_prompt", "original_prompt")?;

    let sub_prompts = match root.get("sub_prompts") {
        None | Some(Value::Null) => {
            return Err(PlanParseError::MissingField("sub_prompts".to_string()));
        }
        Some(Value::Array(items)) => items,
        Some(_) => return Err(PlanParseError::invalid("sub_prompts", "expected an array")),
    };
    if sub_prompts.is_empty() {
        return Err(PlanParseError::EmptySubPrompts);
    }

    let mut plan = Plan::new(original_prompt);
    let mut seen_ids = HashSet::new();
    for (index, item) in sub_prompts.iter().enumerate() {
        let sub = parse_sub_prompt(index, item)?;
        if !seen_ids.insert(sub.id) {
            return Err(PlanParseError::DuplicateId(sub.id));
        }
        plan.sub_prompts.push(sub);
    }
    Ok(plan)
}

fn parse_sub_prompt(index: usize, item: &Value) -> Result<SubPrompt, PlanParseError> {
    let path = format!("sub_prompts[{index}]");
    let object = item
        .as_object()
        .ok_or_else(|| PlanParseError::invalid(&path, "expected an object"))?;

    let id = match object.get("id") {
        None | Some(Value::Null) => return Err(PlanParseError::MissingField(format!("{path}.id"))),
        Some(value) => value
            .as_u64()
            .filter(|id| *id >= 1)
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| {
                PlanParseError::invalid(format!("{path}.id"), "expected a positive integer")
            })?,
    };

    let content = required_string(object, "content", &format!("{path}.content"))?;
    let mut sub = SubPrompt::new(id, content);

    match object.get("opaque_values") {
        None | Some(Value::Null) => {}
        Some(Value::Object(values)) => {
            sub.opaque_values = parse_opaque_values(values, &path)?;
        }
        Some(_) => {
            return Err(PlanParseError::invalid(
                format!("{path}.opaque_values"),
                "expected an object",
            ));
        }
    }

    match object.get("suggested_tools") {
        None | Some(Value::Null) => {}
        Some(Value::Array(tools)) => {
            for (i, tool) in tools.iter().enumerate() {
                let tool = tool.as_str().filter(|t| !t.trim().is_empty()).ok_or_else(|| {
                    PlanParseError::invalid(
                        format!("{path}.suggested_tools[{i}]"),
                        "expected a non-empty string",
                    )
                })?;
                sub.suggested_tools.push(tool.trim().to_string());
            }
        }
        Some(_) => {
            return Err(PlanParseError::invalid(
                format!("{path}.suggested_tools"),
                "expected an array of strings",
            ));
        }
    }

    match object.get("output_schema") {
        None | Some(Value::Null) => {}
        Some(schema @ (Value::Object(_) | Value::Bool(_))) => {
            check_schema(schema)
                .map_err(|message| PlanParseError::InvalidOutputSchema { id, message })?;
            sub.output_schema = Some(schema.clone());
        }
        Some(_) => {
            return Err(PlanParseError::InvalidOutputSchema {
                id,
                message: "expected a JSON Schema object".to_string(),
            });
        }
    }

    Ok(sub)
}

fn parse_opaque_values(
    values: &Map<String, Value>,
    path: &str,
) -> Result<BTreeMap<String, String>, PlanParseError> {
    values
        .iter()
        .map(|(token, value)| {
            let field = format!("{path}.opaque_values.{token}");
            if token.trim().is_empty() {
                return Err(PlanParseError::invalid(field, "empty reference token"));
            }
            match value {
                Value::String(s) => Ok((token.clone(), s.clone())),
                _ => Err(PlanParseError::invalid(field, "expected a string value")),
            }
        })
        .collect()
}

fn required_string<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, PlanParseError> {
    match object.get(key) {
        None | Some(Value::Null) => Err(PlanParseError::MissingField(path.to_string())),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::String(_)) => Err(PlanParseError::invalid(path, "must not be empty")),
        Some(_) => Err(PlanParseError::invalid(path, "expected a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &str = r#"{
        "original_prompt": "Read [FILE_PATH]",
        "sub_prompts": [
            {
                "id": 1,
                "content": "Read the file at [FILE_PATH]",
                "opaque_values": {"[FILE_PATH]": "/etc/hosts"},
                "suggested_tools": ["file-server.read_file"]
            }
        ]
    }"#;

    #[test]
    fn test_parse_valid_plan() {
        let plan = parse_plan(VALID).unwrap();
        assert_eq!(plan.original_prompt, "Read [FILE_PATH]");
        assert_eq!(plan.sub_prompts.len(), 1);
        let sub = &plan.sub_prompts[0];
        assert_eq!(sub.id, 1);
        assert_eq!(sub.resolve("[FILE_PATH]"), Some("/etc/hosts"));
        assert_eq!(sub.suggested_tools, vec!["file-server.read_file"]);
        assert!(sub.output_schema.is_none());
    }

    #[test]
    fn test_parse_fenced_plan() {
        let response = format!("```json\n{VALID}\n```");
        assert!(parse_plan(&response).is_ok());
    }

    #[test]
    fn test_parse_plan_in_prose() {
        let response = format!("Here is the plan:\n{VALID}\nLet me know!");
        assert_eq!(parse_plan(&response).unwrap().sub_prompts.len(), 1);
    }

    #[test]
    fn test_parse_picks_longest_object_when_prose_has_braces() {
        let response = format!("Use {{braces}} carefully. {VALID} (end)");
        assert_eq!(parse_plan(&response).unwrap().original_prompt, "Read [FILE_PATH]");
    }

    #[test]
    fn test_no_json() {
        assert_eq!(parse_plan("I refuse."), Err(PlanParseError::NoJson));
    }

    #[test]
    fn test_missing_sub_prompts() {
        let err = parse_plan_json(&json!({"original_prompt": "x"})).unwrap_err();
        assert_eq!(err, PlanParseError::MissingField("sub_prompts".to_string()));
    }

    #[test]
    fn test_empty_sub_prompts() {
        let err = parse_plan_json(&json!({"original_prompt": "x", "sub_prompts": []})).unwrap_err();
        assert_eq!(err, PlanParseError::EmptySubPrompts);
    }

    #[test]
    fn test_wrong_types_fail_closed() {
        let cases = [
            json!({"original_prompt": 5, "sub_prompts": [{"id": 1, "content": "a"}]}),
            json!({"original_prompt": "x", "sub_prompts": {"id": 1}}),
            json!({"original_prompt": "x", "sub_prompts": [{"id": "1", "content": "a"}]}),
            json!({"original_prompt": "x", "sub_prompts": [{"id": 0, "content": "a"}]}),
            json!({"original_prompt": "x", "sub_prompts": [{"id": 1, "content": ""}]}),
            json!({"original_prompt": "x", "sub_prompts": [{"id": 1, "content": "a", "suggested_tools": "s.t"}]}),
            json!({"original_prompt": "x", "sub_prompts": [{"id": 1, "content": "a", "suggested_tools": [1]}]}),
            json!({"original_prompt": "x", "sub_prompts": [{"id": 1, "content": "a", "opaque_values": {"[A]": 1}}]}),
            json!({"original_prompt": "x", "sub_prompts": ["step one"]}),
        ];
        for case in cases {
            assert!(parse_plan_json(&case).is_err(), "accepted {case}");
        }
    }

    #[test]
    fn test_duplicate_ids() {
        let err = parse_plan_json(&json!({
            "original_prompt": "x",
            "sub_prompts": [{"id": 1, "content": "a"}, {"id": 1, "content": "b"}]
        }))
        .unwrap_err();
        assert_eq!(err, PlanParseError::DuplicateId(1));
    }

    #[test]
    fn test_optional_fields_default() {
        let plan = parse_plan_json(&json!({
            "original_prompt": "x",
            "sub_prompts": [{"id": 3, "content": "think", "opaque_values": null, "suggested_tools": null}]
        }))
        .unwrap();
        assert!(plan.sub_prompts[0].opaque_values.is_empty());
        assert!(plan.sub_prompts[0].suggested_tools.is_empty());
    }

    #[test]
    fn test_output_schema() {
        let plan = parse_plan_json(&json!({
            "original_prompt": "x",
            "sub_prompts": [{"id": 1, "content": "count", "output_schema": {"type": "integer"}}]
        }))
        .unwrap();
        assert_eq!(plan.sub_prompts[0].output_schema, Some(json!({"type": "integer"})));

        let err = parse_plan_json(&json!({
            "original_prompt": "x",
            "sub_prompts": [{"id": 1, "content": "count", "output_schema": "integer"}]
        }))
        .unwrap_err();
        assert!(matches!(err, PlanParseError::InvalidOutputSchema { id: 1, .. }));
    }
}
