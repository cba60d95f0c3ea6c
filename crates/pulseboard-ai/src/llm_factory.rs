use crate::cloudflare_provider::CloudflareProvider;
use crate::llm_provider::*;
use crate::ollama_provider::OllamaCliProvider;
use pulseboard_core::{PulseboardConfig, PulseboardError, SUPPORTED_PROVIDERS};
use std::sync::Arc;

/// Factory for creating LLM providers based on configuration
pub struct LLMProviderFactory;

impl LLMProviderFactory {
    /// Create a single provider by name
    pub fn create(name: &str, config: &PulseboardConfig) -> LLMResult<Arc<dyn LLMProvider>> {
        match name.to_lowercase().as_str() {
            "cloudflare" => Ok(Arc::new(CloudflareProvider::new(
                config.cloudflare.clone(),
            )?)),
            "ollama" => Ok(Arc::new(OllamaCliProvider::new(config.ollama.clone()))),
            other => Err(PulseboardError::Configuration(format!(
                "Unsupported LLM provider: {}. Available providers: {}",
                other,
                SUPPORTED_PROVIDERS.join(", ")
            ))),
        }
    }

    /// Create every configured provider, preserving the configured order
    pub fn create_all(config: &PulseboardConfig) -> LLMResult<Vec<Arc<dyn LLMProvider>>> {
        config
            .ai
            .providers
            .iter()
            .map(|name| Self::create(name, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let providers = LLMProviderFactory::create_all(&PulseboardConfig::default()).unwrap();
        let names: Vec<_> = providers.iter().map(|p| p.provider_name()).collect();
        assert_eq!(names, vec!["cloudflare", "ollama"]);
    }

    #[test]
    fn test_unknown_provider() {
        let result = LLMProviderFactory::create("anthropic", &PulseboardConfig::default());
        match result {
            Err(err) => {
                assert!(err.is_configuration());
                assert!(err.to_string().contains("Unsupported LLM provider"));
            }
            Ok(_) => panic!("anthropic is not a supported provider"),
        }
    }

    #[test]
    fn test_local_only() {
        let mut config = PulseboardConfig::default();
        config.ai.providers = vec!["ollama".to_string()];
        config.ollama.model = "mistral".to_string();

        let providers = LLMProviderFactory::create_all(&config).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].model_name(), "mistral");
    }
}
