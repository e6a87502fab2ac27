use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OllamaApiError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} {message}")]
    Status { status: StatusCode, message: String },
    #[error("blob upload for {digest} rejected: HTTP {status} {message}")]
    BlobRejected {
        digest: String,
        status: StatusCode,
        message: String,
    },
    #[error("malformed response body: {0}")]
    MalformedBody(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl OllamaApiError {
    /// Returns the HTTP status carried by status-class failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } | Self::BlobRejected { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}

/// Builds a readable message from a non-success response body.
///
/// Ollama reports failures as `{"error": "..."}`; OpenAI-compatible servers nest the
/// text as `{"error": {"message": "..."}}`. Anything else is returned verbatim, and an
/// empty body falls back to the status reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let error = value.get("error");
        let message = error
            .and_then(Value::as_str)
            .or_else(|| {
                error
                    .and_then(|error| error.get("message"))
                    .and_then(Value::as_str)
            })
            .map(str::trim)
            .filter(|message| !message.is_empty());
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}
