// Core types for the command dispatch system
//
// Every handler produces an Envelope; the dispatcher adds the outer
// result/error layer understood by the agent runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handler-level result envelope.
///
/// Serializes externally tagged, so a single invocation yields exactly one
/// top-level key: `{"data": ...}`, `{"event": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Data(Value),
    Event(Value),
    Error(String),
}

impl Envelope {
    pub fn error(message: impl Into<String>) -> Self {
        Envelope::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error(_))
    }
}

/// Command definition exposed to the agent runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

/// JSON Schema for command input parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String, // Usually "object"
    pub properties: Value,
    pub required: Vec<String>,
}

impl InputSchema {
    /// Create a simple schema with required string parameters
    pub fn simple(params: Vec<(&str, &str)>) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for (param_name, param_desc) in params.iter() {
            properties.insert(
                param_name.to_string(),
                serde_json::json!({
                    "type": "string",
                    "description": param_desc
                }),
            );
            required.push(param_name.to_string());
        }

        Self {
            schema_type: "object".to_string(),
            properties: Value::Object(properties),
            required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_data_serialization() {
        let envelope = Envelope::Data(json!([{"id": 1}]));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value, json!({"data": [{"id": 1}]}));
    }

    #[test]
    fn test_envelope_event_serialization() {
        let envelope = Envelope::Event(json!({"id": "abc"}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value, json!({"event": {"id": "abc"}}));
    }

    #[test]
    fn test_envelope_error_serialization() {
        let envelope = Envelope::error("boom");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value, json!({"error": "boom"}));
    }

    #[test]
    fn test_envelope_yields_single_top_level_key() {
        for envelope in [
            Envelope::Data(json!(1)),
            Envelope::Event(json!(1)),
            Envelope::error("x"),
        ] {
            let value = serde_json::to_value(&envelope).unwrap();
            assert_eq!(value.as_object().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_simple_input_schema() {
        let schema = InputSchema::simple(vec![
            ("start_date", "Range start in RFC 3339 format"),
            ("end_date", "Range end in RFC 3339 format"),
        ]);

        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.required.len(), 2);
        assert!(schema.required.contains(&"start_date".to_string()));
        assert!(schema.required.contains(&"end_date".to_string()));
    }
}
