/// Default base URL for a locally running Ollama server.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Normalize a base URL for endpoint joining.
///
/// Blank input falls back to [`DEFAULT_OLLAMA_BASE_URL`]; surrounding whitespace and
/// trailing slashes are removed so joined paths never contain `//`.
pub fn normalize_base_url(input: &str) -> String {
    let base = if input.trim().is_empty() {
        DEFAULT_OLLAMA_BASE_URL
    } else {
        input.trim()
    };

    base.trim_end_matches('/').to_string()
}

pub fn tags_url(base_url: &str) -> String {
    format!("{}/api/tags", normalize_base_url(base_url))
}

pub fn blob_url(base_url: &str, digest: &str) -> String {
    format!("{}/api/blobs/{digest}", normalize_base_url(base_url))
}

pub fn chat_url(base_url: &str) -> String {
    format!("{}/api/chat", normalize_base_url(base_url))
}
