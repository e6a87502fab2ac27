use serde_json::{Map, Value};

use crate::error::OllamaApiError;

/// Wrapper keys that hold the model list, probed before any other array field.
const WRAPPER_KEYS: [&str; 2] = ["tags", "models"];

/// Normalizes a model-listing body to a list of model identifiers.
///
/// Accepted shapes: a top-level array, or an object wrapping the array under
/// `tags`/`models` (falling back to its first array-valued field). Entries may be
/// strings, objects with a string `name`, or anything else, which is rendered as
/// its JSON text.
pub fn model_names(body: &Value) -> Result<Vec<String>, OllamaApiError> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(object) => wrapped_entries(object).ok_or_else(|| {
            OllamaApiError::MalformedBody("model listing object holds no model list".to_string())
        })?,
        other => {
            return Err(OllamaApiError::MalformedBody(format!(
                "model listing must be an array or object, got {}",
                value_type_name(other)
            )))
        }
    };

    Ok(entries.iter().map(model_name).collect())
}

fn wrapped_entries(object: &Map<String, Value>) -> Option<&Vec<Value>> {
    WRAPPER_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_array))
        .or_else(|| object.values().find_map(Value::as_array))
}

fn model_name(entry: &Value) -> String {
    match entry {
        Value::String(name) => name.clone(),
        Value::Object(object) => match object.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => entry.to_string(),
        },
        other => other.to_string(),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
