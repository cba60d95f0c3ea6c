use async_trait::async_trait;
use pulseboard_core::PulseboardError;
use serde::{Deserialize, Serialize};

/// Result type for LLM operations
pub type LLMResult<T> = std::result::Result<T, PulseboardError>;

/// Response from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Generated text content, trimmed
    pub content: String,
    /// Model used for generation
    pub model: String,
}

/// Main trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single user prompt
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse>;

    /// Short provider tag, e.g. "cloudflare"
    fn provider_name(&self) -> &str;

    /// Get the model identifier
    fn model_name(&self) -> &str;
}
