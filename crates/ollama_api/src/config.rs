use std::time::Duration;

use crate::url::DEFAULT_OLLAMA_BASE_URL;

/// Default per-request timeout, applied to connect and to each body read.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport configuration for Ollama API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaApiConfig {
    /// Base URL every endpoint path is joined onto.
    pub base_url: String,
    /// Connect timeout and maximum idle gap between body reads.
    pub timeout: Duration,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
}

impl Default for OllamaApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }
}

impl OllamaApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}
