// ABOUTME: Analytics MCP session seam plus the rmcp child-process client behind it.
// ABOUTME: The collector and orchestrator only see `AnalyticsSession`, so tests can script a server.

use async_trait::async_trait;
use pulseboard_core::{McpServerConfig, PulseboardError, Result};
use rmcp::model::{CallToolRequestParam, CallToolResult, Content, GetPromptRequestParam};
use rmcp::service::RunningService;
use rmcp::transport::{IntoTransport, TokioChildProcess};
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Tool and prompt arguments as sent over the wire.
pub type JsonObject = Map<String, Value>;

/// Variables every child needs to locate its interpreter, even with a cleared environment.
const BASELINE_ENV_KEYS: &[&str] = &["HOME", "LOGNAME", "PATH", "SHELL", "TERM", "USER"];

/// One content block of a tool result.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlock {
    pub text: Option<String>,
    pub raw: Value,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            raw: serde_json::json!({ "type": "text", "text": text }),
            text: Some(text),
        }
    }

    /// Build a block from its JSON form; `text` is set for `{"type":"text"}` blocks.
    pub fn from_raw(raw: Value) -> Self {
        let text = match raw.get("type").and_then(Value::as_str) {
            Some("text") => raw.get("text").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        Self { text, raw }
    }
}

/// Content returned by a successful tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolContent {
    pub blocks: Vec<ContentBlock>,
}

impl ToolContent {
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        Self { blocks }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn first_text(&self) -> Option<&str> {
        self.blocks.first().and_then(|b| b.text.as_deref())
    }

    /// Raw JSON array of the blocks, as stored in the snapshot.
    pub fn to_value(&self) -> Value {
        Value::Array(self.blocks.iter().map(|b| b.raw.clone()).collect())
    }
}

/// The four MCP operations the dashboard needs from an analytics server.
#[async_trait]
pub trait AnalyticsSession: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<String>>;

    /// Invoke a tool. A result the server flags as an error is returned as `Err`.
    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<ToolContent>;

    async fn list_prompts(&self) -> Result<Vec<String>>;

    /// Fetch a prompt and return the text of each message, in order.
    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> Result<Vec<String>>;
}

/// Spawned but not yet initialized analytics server.
pub struct ServerProcess {
    transport: TokioChildProcess,
    call_timeout: Duration,
}

impl ServerProcess {
    /// Launch `<command> [--directory <dir>] run <service>` with a restricted environment.
    pub fn spawn(config: &McpServerConfig, call_timeout: Duration) -> Result<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(config.launch_args()).env_clear();
        for key in BASELINE_ENV_KEYS {
            if let Ok(value) = std::env::var(key) {
                cmd.env(key, value);
            }
        }
        for (key, value) in config.forwarded_environment() {
            cmd.env(key, value);
        }

        debug!(
            "Launching MCP server: {} {}",
            config.command,
            config.launch_args().join(" ")
        );

        let (transport, _stderr) = TokioChildProcess::builder(cmd)
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                PulseboardError::Protocol(format!(
                    "Failed to start MCP server '{}': {}",
                    config.command, e
                ))
            })?;

        Ok(Self {
            transport,
            call_timeout,
        })
    }

    /// Run the MCP handshake.
    pub async fn initialize(self) -> Result<RmcpSession> {
        RmcpSession::connect(self.transport, self.call_timeout).await
    }
}

/// Initialized MCP client session, usually over a child process.
pub struct RmcpSession {
    service: RunningService<RoleClient, ()>,
    call_timeout: Duration,
}

impl RmcpSession {
    /// Run the MCP handshake over an already connected transport.
    pub async fn connect<T, E, A>(transport: T, call_timeout: Duration) -> Result<Self>
    where
        T: IntoTransport<RoleClient, E, A>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let service = ().serve(transport).await.map_err(|e| {
            PulseboardError::Protocol(format!("MCP initialization failed: {}", e))
        })?;

        Ok(Self {
            service,
            call_timeout,
        })
    }

    /// Cancel the session and reap the server process.
    pub async fn close(self) {
        match self.service.cancel().await {
            Ok(reason) => debug!("MCP session closed: {:?}", reason),
            Err(e) => warn!("MCP session did not shut down cleanly: {}", e),
        }
    }
}

#[async_trait]
impl AnalyticsSession for RmcpSession {
    async fn list_tools(&self) -> Result<Vec<String>> {
        let tools = self
            .service
            .list_all_tools()
            .await
            .map_err(|e| PulseboardError::Protocol(format!("list_tools failed: {}", e)))?;
        Ok(tools.iter().map(|t| t.name.to_string()).collect())
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<ToolContent> {
        let call = self.service.call_tool(CallToolRequestParam {
            name: name.to_string().into(),
            arguments: Some(arguments),
        });
        let result = bounded(name, self.call_timeout, call).await?;
        tool_content(name, result)
    }

    async fn list_prompts(&self) -> Result<Vec<String>> {
        let prompts = self
            .service
            .list_all_prompts()
            .await
            .map_err(|e| PulseboardError::Protocol(format!("list_prompts failed: {}", e)))?;
        Ok(prompts.iter().map(|p| p.name.to_string()).collect())
    }

    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> Result<Vec<String>> {
        let result = self
            .service
            .get_prompt(GetPromptRequestParam {
                name: name.to_string(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| PulseboardError::Protocol(format!("get_prompt '{}' failed: {}", name, e)))?;

        let mut texts = Vec::with_capacity(result.messages.len());
        for message in &result.messages {
            texts.push(message_text(serde_json::to_value(&message.content)?));
        }
        info!("Prompt '{}' returned {} message(s)", name, texts.len());
        Ok(texts)
    }
}

/// Await a tool call for at most `limit`. A timeout or transport error fails the call.
async fn bounded<T, E, F>(tool: &str, limit: Duration, call: F) -> Result<T>
where
    E: Display,
    F: Future<Output = std::result::Result<T, E>>,
{
    timeout(limit, call)
        .await
        .map_err(|_| {
            PulseboardError::Timeout(format!(
                "{} did not answer within {}s",
                tool,
                limit.as_secs()
            ))
        })?
        .map_err(|e| PulseboardError::tool_call(tool, e))
}

/// Map a tool result onto `ToolContent`; results flagged `isError` fail the call.
fn tool_content(tool: &str, result: CallToolResult) -> Result<ToolContent> {
    let content = ToolContent::new(blocks(&result.content));
    if result.is_error == Some(true) {
        let message = content
            .first_text()
            .unwrap_or("server reported an error")
            .to_string();
        return Err(PulseboardError::tool_call(tool, message));
    }
    Ok(content)
}

fn blocks(content: &[Content]) -> Vec<ContentBlock> {
    content
        .iter()
        .map(|c| {
            let raw = serde_json::to_value(c).unwrap_or(Value::Null);
            match c.as_text() {
                Some(t) => ContentBlock {
                    text: Some(t.text.clone()),
                    raw,
                },
                None => ContentBlock::from_raw(raw),
            }
        })
        .collect()
}

/// Text of a prompt message, or its JSON rendering for non-text content.
fn message_text(content: Value) -> String {
    match ContentBlock::from_raw(content) {
        ContentBlock {
            text: Some(text), ..
        } => text,
        ContentBlock { raw, .. } => raw.to_string(),
    }
}
