pub mod audit;
pub mod cloudflare_provider;
pub mod gateway;
pub mod llm_factory;
pub mod llm_provider;
pub mod ollama_provider;

pub use audit::{audit, HallucinationReport, HALLUCINATION_INDICATORS};
pub use cloudflare_provider::CloudflareProvider;
pub use gateway::{GeneratedResponse, ProviderChain};
pub use llm_factory::LLMProviderFactory;
pub use llm_provider::*;
pub use ollama_provider::OllamaCliProvider;
