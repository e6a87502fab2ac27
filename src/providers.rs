use std::sync::Arc;

use chat_provider::{ChatProvider, ProviderInitError};
use chat_provider_mock::MockProvider;
use chat_provider_ollama::{OllamaProvider, OllamaProviderConfig};

use crate::config::{ChatConfig, ProviderKind};

pub fn provider_for_config(config: &ChatConfig) -> Result<Arc<dyn ChatProvider>, ProviderInitError> {
    match config.provider {
        ProviderKind::Ollama => {
            let provider = OllamaProvider::new(
                OllamaProviderConfig::new()
                    .with_base_url(config.base_url.clone())
                    .with_timeout(config.timeout),
            )?;
            Ok(Arc::new(provider))
        }
        ProviderKind::Mock => Ok(Arc::new(MockProvider::default())),
    }
}
