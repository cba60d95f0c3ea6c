// ABOUTME: Ordered provider chain with automatic fallback between backends.
// ABOUTME: Backend failures move on to the next provider; configuration errors stop the chain.

use crate::llm_factory::LLMProviderFactory;
use crate::llm_provider::*;
use pulseboard_core::{PulseboardConfig, PulseboardError};
use std::sync::Arc;
use tracing::{info, warn};

/// Text produced by one gateway call and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResponse {
    pub text: String,
    pub provider: String,
}

/// Providers tried in order until one succeeds.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn LLMProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LLMProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain from the configured provider order.
    pub fn from_config(config: &PulseboardConfig) -> LLMResult<Self> {
        Ok(Self::new(LLMProviderFactory::create_all(config)?))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.provider_name()).collect()
    }

    /// Generate text with the first provider that succeeds.
    pub async fn generate(&self, prompt: &str) -> LLMResult<GeneratedResponse> {
        if self.providers.is_empty() {
            return Err(PulseboardError::Configuration(
                "No text-generation providers configured".to_string(),
            ));
        }

        let mut failures: Vec<(String, String)> = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.provider_name();
            match provider.generate(prompt).await {
                Ok(response) => {
                    info!("🤖 Generated with {} ({})", name, provider.model_name());
                    return Ok(GeneratedResponse {
                        text: response.content,
                        provider: name.to_string(),
                    });
                }
                Err(err) if err.is_configuration() => return Err(err),
                Err(err) => {
                    warn!("{} failed: {}", name, err);
                    if let Some(next) = self.providers.get(index + 1) {
                        warn!("Falling back to {}...", next.provider_name());
                    }
                    failures.push((name.to_string(), err.to_string()));
                }
            }
        }

        let details = failures
            .iter()
            .map(|(name, message)| format!("{}: {}", name, message))
            .collect::<Vec<_>>()
            .join(", ");
        Err(PulseboardError::Backend(format!(
            "All AI services failed. {}",
            details
        )))
    }
}
