use crate::llm_provider::*;
use async_trait::async_trait;
use pulseboard_core::{CloudflareConfig, PulseboardError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cloudflare Workers AI provider
pub struct CloudflareProvider {
    config: CloudflareConfig,
    client: Client,
}

impl CloudflareProvider {
    /// Create a new provider. Credentials are checked per request so a
    /// missing secret surfaces as a configuration error at generation time.
    pub fn new(config: CloudflareConfig) -> LLMResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PulseboardError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Resolve both secrets or name every one that is missing.
    fn credentials(&self) -> LLMResult<(&str, &str)> {
        let account = self
            .config
            .account_id
            .as_deref()
            .filter(|v| !v.trim().is_empty());
        let token = self
            .config
            .api_token
            .as_deref()
            .filter(|v| !v.trim().is_empty());

        match (account, token) {
            (Some(account), Some(token)) => Ok((account, token)),
            _ => {
                let mut missing = Vec::new();
                if account.is_none() {
                    missing.push("CLOUDFLARE_ACCOUNT_ID");
                }
                if token.is_none() {
                    missing.push("CLOUDFLARE_API_TOKEN");
                }
                Err(PulseboardError::Configuration(format!(
                    "Missing {} environment variable{} (set PULSEBOARD_PROVIDERS=ollama to run locally)",
                    missing.join(" and "),
                    if missing.len() > 1 { "s" } else { "" }
                )))
            }
        }
    }

    fn endpoint(&self, account_id: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.config.base_url.trim_end_matches('/'),
            account_id,
            self.config.model
        )
    }

    fn build_request(&self, prompt: &str) -> CloudflareRequest {
        CloudflareRequest {
            messages: vec![CloudflareMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    async fn send_request(&self, prompt: &str) -> LLMResult<String> {
        let (account_id, api_token) = self.credentials()?;
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(self.endpoint(account_id))
            .bearer_auth(api_token)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PulseboardError::Backend(format!("Cloudflare AI request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        if !status.is_success() {
            return Err(PulseboardError::Backend(format!(
                "Cloudflare AI error ({}): {}",
                status.as_u16(),
                body
            )));
        }

        parse_envelope(&body)
    }
}

/// Extract `result.response` from a Workers AI envelope.
fn parse_envelope(body: &str) -> LLMResult<String> {
    let envelope: CloudflareEnvelope = serde_json::from_str(body).map_err(|e| {
        PulseboardError::Backend(format!("Cloudflare AI returned invalid JSON ({}): {}", e, body))
    })?;

    if !envelope.success {
        return Err(PulseboardError::Backend(format!(
            "Cloudflare AI API error: {}",
            body
        )));
    }

    envelope
        .result
        .and_then(|r| r.response)
        .map(|text| text.trim().to_string())
        .ok_or_else(|| {
            PulseboardError::Backend(format!(
                "Cloudflare AI API error: response text missing in {}",
                body
            ))
        })
}

#[async_trait]
impl LLMProvider for CloudflareProvider {
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        let start = Instant::now();
        let content = self.send_request(prompt).await?;
        debug!(
            "Cloudflare AI responded in {}ms ({} chars)",
            start.elapsed().as_millis(),
            content.len()
        );

        Ok(LLMResponse {
            content,
            model: self.config.model.clone(),
        })
    }

    fn provider_name(&self) -> &str {
        "cloudflare"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Workers AI request/response types

#[derive(Debug, Serialize)]
struct CloudflareRequest {
    messages: Vec<CloudflareMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CloudflareMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CloudflareEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Option<CloudflareResult>,
    #[serde(default)]
    #[allow(dead_code)]
    errors: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct CloudflareResult {
    #[serde(default)]
    response: Option<String>,
}
