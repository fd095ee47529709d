//! Provider selection from configuration.

use std::sync::Arc;

use llamantin_config::AppConfig;
use llamantin_core::error::ProviderError;
use llamantin_core::provider::Provider;
use tracing::info;

use crate::ollama::OllamaProvider;
use crate::openai_compat::{OPENAI_BASE_URL, OpenAiCompatProvider};

/// Build the configured chat provider.
pub fn create_provider(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let llm = &config.llm;
    let provider: Arc<dyn Provider> = match llm.provider.as_str() {
        "ollama" => Arc::new(OllamaProvider::new(&llm.ollama_base_url)),
        "openai" => {
            let api_key = llm.openai_api_key.clone().ok_or_else(|| {
                ProviderError::NotConfigured("OPENAI_API_KEY is required for the openai provider".into())
            })?;
            let base_url = llm.openai_base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            Arc::new(OpenAiCompatProvider::new("openai", base_url, api_key))
        }
        other => return Err(ProviderError::UnsupportedProvider(other.to_string())),
    };

    info!(provider = provider.name(), model = %llm.model, "LLM provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_ollama() {
        let provider = create_provider(&AppConfig::default()).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn openai_requires_api_key() {
        let mut config = AppConfig::default();
        config.llm.provider = "openai".into();
        assert!(matches!(
            create_provider(&config),
            Err(ProviderError::NotConfigured(_))
        ));

        config.llm.openai_api_key = Some("sk-test".into());
        assert_eq!(create_provider(&config).unwrap().name(), "openai");
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = AppConfig::default();
        config.llm.provider = "invalid".into();
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("Unsupported LLM provider"));
    }
}
