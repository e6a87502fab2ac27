//! Transport-only client primitives for an Ollama-compatible model server.
//!
//! This crate owns request building, response decoding and payload extraction for
//! the three endpoints the chat client uses (`/api/tags`, `/api/blobs`, `/api/chat`).
//! It has no UI or conversation-state coupling.
//!
//! Streamed chat responses are newline-delimited JSON whose per-line shape differs
//! between server implementations; [`extract::extract_text`] normalizes the known
//! shapes and [`ndjson::NdjsonLineDecoder`] falls back to raw line text so no payload
//! is silently dropped.

pub mod blob;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod ndjson;
pub mod payload;
pub mod url;

pub use blob::blob_digest;
pub use client::{FragmentStream, OllamaApiClient};
pub use config::OllamaApiConfig;
pub use error::OllamaApiError;
pub use extract::extract_text;
pub use models::model_names;
pub use ndjson::NdjsonLineDecoder;
pub use payload::{ChatMessage, ChatRequest, ChatRole};
pub use url::{normalize_base_url, DEFAULT_OLLAMA_BASE_URL};
