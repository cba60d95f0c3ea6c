use crate::llm_provider::*;
use async_trait::async_trait;
use pulseboard_core::{OllamaConfig, PulseboardError};
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Local fallback that pipes the prompt through `ollama run <model>`.
pub struct OllamaCliProvider {
    config: OllamaConfig,
}

impl OllamaCliProvider {
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }

    async fn run_model(&self, input: &str) -> LLMResult<String> {
        let mut child = Command::new(&self.config.binary)
            .arg("run")
            .arg(&self.config.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => PulseboardError::Backend(
                    "Ollama is not installed or not in PATH".to_string(),
                ),
                _ => PulseboardError::Backend(format!("Failed to start ollama: {}", e)),
            })?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| {
                PulseboardError::Backend("Failed to open stdin for ollama".to_string())
            })?;
            // A model that exits early closes the pipe; its exit status tells the story.
            if let Err(e) = stdin.write_all(input.as_bytes()).await {
                if e.kind() != ErrorKind::BrokenPipe {
                    return Err(PulseboardError::Backend(format!(
                        "Failed writing prompt to ollama: {}",
                        e
                    )));
                }
                debug!("ollama closed stdin early: {}", e);
            }
        }

        let output = timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            PulseboardError::Backend(format!(
                "Ollama timed out after {}s",
                self.config.timeout_secs
            ))
        })?
        .map_err(|e| PulseboardError::Backend(format!("Failed to wait for ollama: {}", e)))?;

        if !output.status.success() {
            return Err(PulseboardError::Backend(format!(
                "Ollama error: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl LLMProvider for OllamaCliProvider {
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        let start = Instant::now();
        let content = self.run_model(prompt).await?;
        debug!(
            "ollama ({}) finished in {}ms",
            self.config.model,
            start.elapsed().as_millis()
        );

        Ok(LLMResponse {
            content,
            model: self.config.model.clone(),
        })
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
