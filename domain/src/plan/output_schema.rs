//! Output schema checks for tool results.

use jsonschema::JSONSchema;
use serde_json::Value;

/// Check that `schema` compiles as a JSON Schema.
pub fn check_schema(schema: &Value) -> Result<(), String> {
    JSONSchema::compile(schema)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Validate `instance` against `schema`, joining every violation.
pub fn validate_output(schema: &Value, instance: &Value) -> Result<(), String> {
    let compiled = JSONSchema::compile(schema).map_err(|e| e.to_string())?;
    compiled.validate(instance).map_err(|errors| {
        errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_output() {
        let schema = json!({"type": "object", "required": ["rows"]});
        assert!(validate_output(&schema, &json!({"rows": []})).is_ok());
    }

    #[test]
    fn test_invalid_output_reports_path() {
        let schema = json!({
            "type": "object",
            "properties": {"count": {"type": "integer"}}
        });
        let err = validate_output(&schema, &json!({"count": "three"})).unwrap_err();
        assert!(err.contains("/count"), "{err}");
    }

    #[test]
    fn test_string_output_against_string_schema() {
        let schema = json!({"type": "string", "minLength": 1});
        assert!(validate_output(&schema, &json!("done")).is_ok());
        assert!(validate_output(&schema, &json!("")).is_err());
    }

    #[test]
    fn test_check_schema_rejects_garbage() {
        assert!(check_schema(&json!({"type": "object"})).is_ok());
        assert!(check_schema(&json!({"type": 12})).is_err());
    }
}
