//! Argument schemas for model-facing tools.
//!
//! Models produce tool arguments as JSON, often wrapped in a markdown code
//! fence. `ArgSchema` strips the fence, parses, and rejects calls whose keys
//! do not line up with the declared parameters.

use super::error::{ToolError, ToolResult};
use serde_json::{json, Map, Value};

/// One declared tool parameter
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }
}

/// Declared parameters of one tool
#[derive(Debug, Clone)]
pub struct ArgSchema {
    name: String,
    args: Vec<ArgSpec>,
}

impl ArgSchema {
    pub fn new(name: impl Into<String>, args: Vec<ArgSpec>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check a JSON argument payload against the schema.
    ///
    /// A string payload is un-fenced and parsed first. The payload must be a
    /// JSON object; unknown keys and missing required keys are rejected.
    pub fn validate(&self, arguments: &Value) -> ToolResult<Map<String, Value>> {
        let object = match arguments {
            Value::Object(map) => map.clone(),
            Value::String(text) => {
                let stripped = strip_code_fence(text);
                let parsed: Value = serde_json::from_str(stripped).map_err(|_| {
                    ToolError::InvalidArguments(format!("invalid json format: {stripped}"))
                })?;
                match parsed {
                    Value::Object(map) => map,
                    other => {
                        return Err(ToolError::InvalidArguments(format!(
                            "expected a JSON object for '{}', got: {other}",
                            self.name
                        )))
                    }
                }
            }
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "expected a JSON object for '{}', got: {other}",
                    self.name
                )))
            }
        };

        let unknown: Vec<&str> = object
            .keys()
            .filter(|key| !self.args.iter().any(|arg| &arg.name == *key))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ToolError::InvalidArguments(format!(
                "unknown arguments: {}",
                unknown.join(", ")
            )));
        }

        let missing: Vec<&str> = self
            .args
            .iter()
            .filter(|arg| arg.required && !object.contains_key(&arg.name))
            .map(|arg| arg.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ToolError::InvalidArguments(format!(
                "missing required arguments: {}",
                missing.join(", ")
            )));
        }

        Ok(object)
    }

    /// JSON Schema projection for `Tool::parameters`
    pub fn to_parameters(&self) -> Value {
        let mut properties = Map::new();
        for arg in &self.args {
            properties.insert(
                arg.name.clone(),
                json!({
                    "type": "string",
                    "description": arg.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .args
            .iter()
            .filter(|arg| arg.required)
            .map(|arg| arg.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Strip a surrounding markdown code fence, when the payload carries one.
/// The leading marker is only removed when the trailing fence is present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(body) = trimmed.strip_suffix("\n```") {
        let body = body.strip_prefix("```json\n").unwrap_or(body);
        return body.trim();
    }
    trimmed
}
