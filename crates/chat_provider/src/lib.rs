//! Provider-neutral contract for listing models, uploading blobs and streaming one chat
//! reply.
//!
//! Only lifecycle and envelope types live here. Wire payloads, HTTP transport and
//! conversation bookkeeping belong to the adapters and the application.

use serde_json::{Map, Value};
use thiserror::Error;

/// Identifier for one chat stream.
pub type StreamId = u64;

/// Error returned while constructing/configuring a provider before any call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure of a network operation: non-2xx, connection failure, timeout or an
/// unreadable body. Carried as a user-presentable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for TransportError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for TransportError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

/// One message of the request envelope. `images` holds base64-encoded file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
    pub images: Vec<String>,
}

impl PromptMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(PromptRole::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(PromptRole::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(PromptRole::Assistant, content)
    }

    #[must_use]
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    fn text(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }
}

/// Input required to open one chat stream. Built fresh per send.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatStreamRequest {
    pub stream_id: StreamId,
    pub model: String,
    pub messages: Vec<PromptMessage>,
    /// Extra top-level request fields merged beside `model` and `messages`.
    pub params: Map<String, Value>,
}

/// Provider-emitted lifecycle event for a chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment { stream_id: StreamId, text: String },
    Ended { stream_id: StreamId },
    Failed { stream_id: StreamId, error: String },
}

impl StreamEvent {
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        match self {
            Self::Fragment { stream_id, .. }
            | Self::Ended { stream_id }
            | Self::Failed { stream_id, .. } => *stream_id,
        }
    }

    /// Returns true when this event terminates the stream lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended { .. } | Self::Failed { .. })
    }
}

/// Immutable metadata describing a chat provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub endpoint: String,
}

/// Blocking provider interface. Every call runs on a worker thread owned by the caller.
pub trait ChatProvider: Send + Sync + 'static {
    fn profile(&self) -> ProviderProfile;

    /// Returns the model identifiers the server offers.
    fn list_models(&self) -> Result<Vec<String>, TransportError>;

    /// Uploads content-addressed bytes and returns their `sha256:<hex>` digest.
    fn upload_blob(&self, bytes: &[u8]) -> Result<String, TransportError>;

    /// Streams one reply: `Fragment` events in arrival order, then exactly one terminal
    /// `Ended` or `Failed` event.
    ///
    /// An `Err` return means the provider could not report a terminal event itself;
    /// the caller converts it into `Failed`.
    fn chat(
        &self,
        req: ChatStreamRequest,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), TransportError>;
}
