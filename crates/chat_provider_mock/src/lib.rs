//! Deterministic mock implementation of the shared `chat_provider` contract.
//!
//! This crate performs no network I/O and is intended for local development and
//! contract-level integration testing. Blob digests come from `ollama_api` so the
//! identifier format is defined once. Every call is recorded so
//! tests can assert which operations reached the provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chat_provider::{
    ChatProvider, ChatStreamRequest, ProviderProfile, StreamEvent, TransportError,
};
use ollama_api::blob_digest;

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Deterministic mock provider used by `ollama_chat` tests and local runs.
#[derive(Debug)]
pub struct MockProvider {
    models: Vec<String>,
    fragments: Vec<String>,
    failure: Option<String>,
    list_failure: Option<String>,
    fragment_delay: Duration,
    chat_calls: AtomicUsize,
    list_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    chat_requests: Mutex<Vec<ChatStreamRequest>>,
}

impl MockProvider {
    /// Creates a mock provider streaming `fragments` verbatim with no delay.
    #[must_use]
    pub fn new(fragments: Vec<String>) -> Self {
        Self {
            models: vec!["mock".to_string(), "mock-vision".to_string()],
            fragments,
            failure: None,
            list_failure: None,
            fragment_delay: Duration::ZERO,
            chat_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            chat_requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Ends every chat with `Failed { error }` after the scripted fragments.
    #[must_use]
    pub fn with_failure(mut self, error: impl Into<String>) -> Self {
        self.failure = Some(error.into());
        self
    }

    #[must_use]
    pub fn with_list_failure(mut self, error: impl Into<String>) -> Self {
        self.list_failure = Some(error.into());
        self
    }

    #[must_use]
    pub fn with_fragment_delay(mut self, delay: Duration) -> Self {
        self.fragment_delay = delay;
        self
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Requests received by `chat`, in call order.
    pub fn chat_requests(&self) -> Vec<ChatStreamRequest> {
        lock_unpoisoned(&self.chat_requests).clone()
    }

    const TOKEN_DELAY_MS: u64 = 40;
}

impl Default for MockProvider {
    /// Streams a short canned reply word by word, paced like a local model.
    fn default() -> Self {
        let reply = "This reply comes from the mock provider. \
                     Set OLLAMA_CHAT_PROVIDER=ollama to talk to a real server.";
        let mut fragments = Vec::new();
        let mut pending = String::new();
        for ch in reply.chars() {
            pending.push(ch);
            if ch == ' ' {
                fragments.push(std::mem::take(&mut pending));
            }
        }
        if !pending.is_empty() {
            fragments.push(pending);
        }

        Self::new(fragments).with_fragment_delay(Duration::from_millis(Self::TOKEN_DELAY_MS))
    }
}

impl ChatProvider for MockProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            endpoint: "mock://local".to_string(),
        }
    }

    fn list_models(&self) -> Result<Vec<String>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        match &self.list_failure {
            Some(error) => Err(TransportError::new(error.clone())),
            None => Ok(self.models.clone()),
        }
    }

    fn upload_blob(&self, bytes: &[u8]) -> Result<String, TransportError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(blob_digest(bytes))
    }

    fn chat(
        &self,
        req: ChatStreamRequest,
        emit: &mut dyn FnMut(StreamEvent),
    ) -> Result<(), TransportError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        let stream_id = req.stream_id;
        lock_unpoisoned(&self.chat_requests).push(req);

        for fragment in &self.fragments {
            if !self.fragment_delay.is_zero() {
                thread::sleep(self.fragment_delay);
            }

            emit(StreamEvent::Fragment {
                stream_id,
                text: fragment.clone(),
            });
        }

        match &self.failure {
            Some(error) => emit(StreamEvent::Failed {
                stream_id,
                error: error.clone(),
            }),
            None => emit(StreamEvent::Ended { stream_id }),
        }

        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
