//! Decoder implementations

use super::types::RecordDecoder;
use crate::error::{Error, Result};
use serde_json::Value;

// ============================================================================
// JSON Decoder
// ============================================================================

/// JSON decoder with optional record path extraction
#[derive(Debug, Clone, Default)]
pub struct JsonDecoder {
    /// Path to the records
    record_path: Option<String>,
    /// Unwrap Relay `{"node": {...}}` edges
    unwrap_node: bool,
}

impl JsonDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a JSON decoder with a record path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            record_path: Some(path.into()),
            unwrap_node: true,
        }
    }

    /// Enable or disable Relay node unwrapping
    #[must_use]
    pub fn unwrap_node(mut self, unwrap: bool) -> Self {
        self.unwrap_node = unwrap;
        self
    }

    /// Extract records from a JSON value using a path
    fn extract_records(&self, value: &Value) -> Result<Vec<Value>> {
        let records = match &self.record_path {
            Some(path) => {
                // Simple paths handle negative indices; jsonpath-rust only
                // for wildcards
                if path.contains('*') && !path.contains("[-") {
                    extract_with_jsonpath(value, path)?
                } else {
                    match lookup(value, path) {
                        Some(Value::Array(arr)) => arr.clone(),
                        Some(Value::Null) | None => vec![],
                        Some(v) => vec![v.clone()],
                    }
                }
            }
            None => match value {
                Value::Array(arr) => arr.clone(),
                _ => vec![value.clone()],
            },
        };

        if self.unwrap_node {
            Ok(records.into_iter().map(unwrap_node).collect())
        } else {
            Ok(records)
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &Value) -> Result<Vec<Value>> {
        match body {
            Value::Object(_) | Value::Array(_) => self.extract_records(body),
            Value::Null => Err(Error::decode("empty response body")),
            other => Err(Error::decode(format!(
                "expected a JSON object or array, got {}",
                json_type(other)
            ))),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn unwrap_node(record: Value) -> Value {
    match record {
        // Relay edges may carry a cursor next to the node
        Value::Object(mut map)
            if map.contains_key("node") && map.keys().all(|k| k == "node" || k == "cursor") =>
        {
            map.remove("node").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Look up a value by dot-notation path
///
/// Supports `a.b`, `$.a.b`, array indexing like `data[0]` or `items[-1]`,
/// and `items[*]` (returns the array itself).
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value);
    }

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            if index_str == "*" {
                return Some(current);
            }
            let index = index_str.parse::<i64>().ok()?;
            let arr = current.as_array()?;
            let idx = if index < 0 {
                arr.len().checked_sub(index.unsigned_abs() as usize)?
            } else {
                index as usize
            };
            current = arr.get(idx)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current)
}

/// Look up a value by path and render scalars as a string
pub fn lookup_string(value: &Value, path: &str) -> Option<String> {
    match lookup(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract records using jsonpath-rust
fn extract_with_jsonpath(value: &Value, path: &str) -> Result<Vec<Value>> {
    use jsonpath_rust::JsonPath;

    let jp = JsonPath::try_from(path).map_err(|e| Error::JsonPath {
        message: format!("Invalid JSONPath: {e}"),
    })?;

    match jp.find(value) {
        Value::Array(arr) => Ok(arr),
        Value::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}
