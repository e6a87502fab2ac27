use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message author role on the chat wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Base64-encoded images for vision-capable models.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// Body of `POST /api/chat`: `{model, messages, ...params}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Extra top-level request fields such as `options` or `keep_alive`.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            params: Map::new(),
        }
    }

    /// Merges extra top-level fields. `model` and `messages` are owned by the
    /// envelope and are never overridden by params.
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(
            params
                .into_iter()
                .filter(|(key, _)| key != "model" && key != "messages"),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn params_are_flattened_beside_model_and_messages() {
        let mut params = Map::new();
        params.insert("options".to_string(), json!({"temperature": 0.2}));
        params.insert("model".to_string(), json!("hijack"));
        let request = ChatRequest::new(
            "llava",
            vec![
                ChatMessage::new(ChatRole::System, "sys"),
                ChatMessage::new(ChatRole::User, "what is this").with_images(vec!["aGk=".to_string()]),
            ],
        )
        .with_params(params);

        let body = serde_json::to_value(&request).expect("serialize chat request");
        assert_eq!(
            body,
            json!({
                "model": "llava",
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "what is this", "images": ["aGk="]}
                ],
                "options": {"temperature": 0.2}
            })
        );
    }
}
