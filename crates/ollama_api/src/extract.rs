//! Shape-tolerant text extraction for streamed model payloads.
//!
//! One streamed line may follow any of several conventions: a single text field
//! (`/api/generate`, TGI), a chat message (`/api/chat`), a delta event, or an
//! OpenAI-style `choices` list. Extraction runs an ordered chain of matchers and
//! stops at the first one that produces text.

use serde_json::{Map, Value};

/// Top-level string fields probed in priority order.
pub const TEXT_FIELDS: [&str; 5] = [
    "response",
    "text",
    "generated_text",
    "output_text",
    "content",
];

type Matcher = fn(&Map<String, Value>) -> Option<String>;

const OBJECT_MATCHERS: [Matcher; 4] = [
    match_text_field,
    match_message,
    match_delta,
    match_choices,
];

/// Returns the text fragment carried by `value`, or `None` when no known shape
/// matches. `None` is a soft miss: callers substitute the raw line text.
pub fn extract_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Object(object) => OBJECT_MATCHERS
            .iter()
            .find_map(|matcher| matcher(object)),
        _ => None,
    }
}

fn match_text_field(object: &Map<String, Value>) -> Option<String> {
    TEXT_FIELDS
        .iter()
        .find_map(|field| string_field(object, field))
}

fn match_message(object: &Map<String, Value>) -> Option<String> {
    let message = object
        .get("message")
        .filter(|value| is_truthy(value))
        .or_else(|| object.get("msg"))?
        .as_object()?;

    if let Some(text) = string_field(message, "content").or_else(|| string_field(message, "text")) {
        return Some(text);
    }

    let parts = message.get("content")?.as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|part| {
            // A truthy `text` claims the part even when it is not a string.
            part.get("text")
                .filter(|text| is_truthy(text))
                .or_else(|| part.get("content"))
                .and_then(Value::as_str)
        })
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

fn match_delta(object: &Map<String, Value>) -> Option<String> {
    let delta = object.get("delta")?.as_object()?;
    string_field(delta, "content").or_else(|| string_field(delta, "text"))
}

fn match_choices(object: &Map<String, Value>) -> Option<String> {
    let choices = object.get("choices")?.as_array()?;
    let texts: Vec<String> = choices
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|choice| {
            string_field(choice, "text")
                .or_else(|| nested_content(choice, "message"))
                .or_else(|| nested_content(choice, "delta"))
        })
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

fn nested_content(object: &Map<String, Value>, key: &str) -> Option<String> {
    string_field(object.get(key)?.as_object()?, "content")
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_owned)
}

// Mirrors loose truthiness so an empty or null `message` defers to `msg`.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::extract_text;

    #[test]
    fn bare_string_is_returned_as_is() {
        assert_eq!(extract_text(&json!("tok")), Some("tok".to_string()));
    }

    #[test]
    fn top_level_fields_follow_priority_order() {
        let value = json!({"content": "last", "text": "second", "response": "first"});
        assert_eq!(extract_text(&value), Some("first".to_string()));

        let value = json!({"content": "last", "generated_text": "third"});
        assert_eq!(extract_text(&value), Some("third".to_string()));
    }

    #[test]
    fn non_string_top_level_field_is_skipped() {
        let value = json!({"response": 7, "output_text": "ok"});
        assert_eq!(extract_text(&value), Some("ok".to_string()));
    }

    #[test]
    fn ollama_chat_message_content_is_extracted() {
        let value = json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "Hel"},
            "done": false
        });
        assert_eq!(extract_text(&value), Some("Hel".to_string()));
    }

    #[test]
    fn msg_alias_is_used_when_message_is_empty() {
        let value = json!({"message": null, "msg": {"text": "alias"}});
        assert_eq!(extract_text(&value), Some("alias".to_string()));
    }

    #[test]
    fn message_content_parts_are_concatenated_in_order() {
        let value = json!({
            "message": {
                "content": [
                    {"type": "text", "text": "a"},
                    {"type": "image", "url": "x"},
                    "bare",
                    {"content": "b"},
                    {"text": "c"}
                ]
            }
        });
        assert_eq!(extract_text(&value), Some("abc".to_string()));
    }

    #[test]
    fn part_with_non_string_text_is_dropped_not_read_from_content() {
        let value = json!({
            "message": {
                "content": [
                    {"text": {"value": "nested"}, "content": "hidden"},
                    {"text": "", "content": "shown"},
                    {"text": null, "content": "!"}
                ]
            }
        });
        assert_eq!(extract_text(&value), Some("shown!".to_string()));
    }

    #[test]
    fn message_with_no_string_parts_falls_through_to_later_matchers() {
        let value = json!({
            "message": {"content": [{"type": "image"}]},
            "delta": {"text": "from delta"}
        });
        assert_eq!(extract_text(&value), Some("from delta".to_string()));
    }

    #[test]
    fn delta_prefers_content_over_text() {
        let value = json!({"delta": {"text": "t", "content": "c"}});
        assert_eq!(extract_text(&value), Some("c".to_string()));
    }

    #[test]
    fn choices_are_concatenated_across_entries() {
        let value = json!({
            "choices": [
                {"text": "one "},
                {"message": {"content": "two "}},
                {"delta": {"content": "three"}},
                {"delta": {"role": "assistant"}},
                "ignored"
            ]
        });
        assert_eq!(extract_text(&value), Some("one two three".to_string()));
    }

    #[test]
    fn choice_text_wins_over_nested_shapes() {
        let value = json!({"choices": [{"text": "direct", "delta": {"content": "nested"}}]});
        assert_eq!(extract_text(&value), Some("direct".to_string()));
    }

    #[test]
    fn unknown_shapes_are_not_extractable() {
        assert_eq!(extract_text(&json!({"done": true, "eval_count": 12})), None);
        assert_eq!(extract_text(&json!({"choices": []})), None);
        assert_eq!(extract_text(&json!([1, 2])), None);
        assert_eq!(extract_text(&json!(null)), None);
        assert_eq!(extract_text(&json!(3)), None);
    }
}
