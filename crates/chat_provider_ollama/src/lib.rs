//! Ollama-backed implementation of the shared `chat_provider` contract.
//!
//! Every call blocks the calling worker thread on a fresh current-thread tokio runtime
//! and translates `ollama_api` results into `StreamEvent`s and `TransportError`s.

use std::sync::Arc;
use std::time::Duration;

use chat_provider::{
    ChatProvider, ChatStreamRequest, PromptMessage, PromptRole, ProviderInitError,
    ProviderProfile, StreamEvent, TransportError,
};
use ollama_api::{
    ChatMessage, ChatRequest, ChatRole, OllamaApiClient, OllamaApiConfig, OllamaApiError,
};
use serde_json::{Map, Value};
use tracing::debug;

/// Stable provider identifier used by `ollama_chat` startup selection.
pub const OLLAMA_PROVIDER_ID: &str = "ollama";

const USER_AGENT: &str = concat!("ollama_chat/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration for the Ollama provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OllamaProviderConfig {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Extra request fields sent with every chat, beneath per-request params.
    pub params: Map<String, Value>,
}

impl OllamaProviderConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn to_api_config(&self) -> OllamaApiConfig {
        let mut config = OllamaApiConfig::default().with_user_agent(USER_AGENT);

        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

trait Transport: Send + Sync {
    fn list_models(&self) -> Result<Vec<String>, TransportError>;

    fn upload_blob(&self, bytes: &[u8]) -> Result<String, TransportError>;

    fn chat(
        &self,
        request: &ChatRequest,
        on_fragment: &mut dyn FnMut(String),
    ) -> Result<(), TransportError>;
}

#[derive(Debug)]
struct DefaultTransport {
    client: OllamaApiClient,
}

impl DefaultTransport {
    fn block_on<T>(
        &self,
        future: impl std::future::Future<Output = Result<T, OllamaApiError>>,
    ) -> Result<T, TransportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                TransportError::new(format!("failed to initialize tokio runtime: {error}"))
            })?;

        runtime.block_on(future).map_err(map_api_error)
    }
}

impl Transport for DefaultTransport {
    fn list_models(&self) -> Result<Vec<String>, TransportError> {
        self.block_on(self.client.list_models())
    }

    fn upload_blob(&self, bytes: &[u8]) -> Result<String, TransportError> {
        self.block_on(self.client.upload_blob(bytes))
    }

    fn chat(
        &self,
        request: &ChatRequest,
        on_fragment: &mut dyn FnMut(String),
    ) -> Result<(), TransportError> {
        self.block_on(self.client.stream_with_handler(request, on_fragment))
    }
}

/// `ChatProvider` adapter backed by `ollama_api` transport primitives.
pub struct OllamaProvider {
    endpoint: String,
    params: Map<String, Value>,
    transport: Arc<dyn Transport>,
}

impl OllamaProvider {
    /// Creates a provider using real HTTP transport.
    pub fn new(config: OllamaProviderConfig) -> Result<Self, ProviderInitError> {
        if config.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ProviderInitError::new(
                "Failed to initialize ollama provider: timeout must be greater than zero",
            ));
        }

        let client = OllamaApiClient::new(config.to_api_config()).map_err(map_init_error)?;

        Ok(Self {
            endpoint: client.base_url(),
            params: config.params,
            transport: Arc::new(DefaultTransport { client }),
        })
    }

    fn build_request(&self, req: &ChatStreamRequest) -> ChatRequest {
        let messages = req.messages.iter().map(to_chat_message).collect();
        let mut params = self.params.clone();
        params.extend(req.params.clone());

        ChatRequest::new(req.model.clone(), messages).with_params(params)
    }

    #[cfg(test)]
    fn with_transport_for_tests(transport: Arc<dyn Transport>) -> Self {
        Self {
            endpoint: ollama_api::DEFAULT_OLLAMA_BASE_URL.to_string(),
            params: Map::new(),
            transport,
        }
    }
}

impl ChatProvider for OllamaProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: OLLAMA_PROVIDER_ID.to_string(),
            endpoint: self.endpoint.clone(),
        }
    }

    fn list_models(&self) -> Result<Vec<String>, TransportError> {
        self.transport.list_models()
    }

    fn upload_blob(&self, bytes: &[u8]) -> Result<String, TransportError> {
        self.transport.upload_blob(bytes)
    }

    fn chat(
        &self,
        req: ChatStreamRequest,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), TransportError> {
        let stream_id = req.stream_id;
        let request = self.build_request(&req);
        debug!(stream_id, model = %request.model, "dispatching chat stream");

        let mut on_fragment = |text: String| {
            if !text.is_empty() {
                emit(StreamEvent::Fragment { stream_id, text });
            }
        };

        let outcome = self.transport.chat(&request, &mut on_fragment);
        match outcome {
            Ok(()) => emit(StreamEvent::Ended { stream_id }),
            Err(error) => emit(StreamEvent::Failed {
                stream_id,
                error: error.message().to_string(),
            }),
        }

        Ok(())
    }
}

fn to_chat_message(message: &PromptMessage) -> ChatMessage {
    let role = match message.role {
        PromptRole::System => ChatRole::System,
        PromptRole::User => ChatRole::User,
        PromptRole::Assistant => ChatRole::Assistant,
    };

    ChatMessage::new(role, message.content.clone()).with_images(message.images.clone())
}

fn map_api_error(error: OllamaApiError) -> TransportError {
    TransportError::new(error.to_string())
}

fn map_init_error(error: OllamaApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize ollama provider: {error}"))
}
