//! Environment configuration, resolved once at startup.

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const BASE_URL_ENV_VAR: &str = "OLLAMA_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "OLLAMA_CHAT_TIMEOUT_SEC";
pub const PROVIDER_ENV_VAR: &str = "OLLAMA_CHAT_PROVIDER";
pub const SYSTEM_INSTRUCTIONS_ENV_VAR: &str = "OLLAMA_CHAT_SYSTEM_INSTRUCTIONS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "You are an assistant that describes images.\n\
     When a user message contains an attached image, treat that image as the primary content.\n\
     Do not mention upload mechanisms.\n\
     Only describe visible content.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    Mock,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds greater than zero, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("Unsupported provider '{value}' in {var}. Available providers: ollama, mock")]
    UnknownProvider { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub provider: ProviderKind,
    pub system_instructions: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            provider: ProviderKind::Ollama,
            system_instructions: DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let base_url = value(BASE_URL_ENV_VAR)
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);

        let timeout = match value(TIMEOUT_ENV_VAR) {
            Some(raw) => parse_timeout(&raw)?,
            None => defaults.timeout,
        };

        let provider = match value(PROVIDER_ENV_VAR) {
            Some(raw) => parse_provider(&raw)?,
            None => defaults.provider,
        };

        let system_instructions =
            value(SYSTEM_INSTRUCTIONS_ENV_VAR).unwrap_or(defaults.system_instructions);

        Ok(Self {
            base_url,
            timeout,
            provider,
            system_instructions,
        })
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout {
            var: TIMEOUT_ENV_VAR,
            value: raw.to_string(),
        }),
    }
}

fn parse_provider(raw: &str) -> Result<ProviderKind, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "ollama" => Ok(ProviderKind::Ollama),
        "mock" => Ok(ProviderKind::Mock),
        _ => Err(ConfigError::UnknownProvider {
            var: PROVIDER_ENV_VAR,
            value: raw.to_string(),
        }),
    }
}
