// Shared fakes for the pulseboard-mcp integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use pulseboard_ai::{LLMProvider, LLMResponse, LLMResult, ProviderChain};
use pulseboard_core::{PulseboardError, Result};
use pulseboard_mcp::{AnalyticsSession, ContentBlock, JsonObject, ToolContent};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type ToolHandler = Box<dyn Fn(&str, &JsonObject) -> Result<ToolContent> + Send + Sync>;

pub const WEBSITES_JSON: &str =
    r#"{"data":[{"domain":"a.com","id":"1"},{"domain":"example.com","id":"site-42"}]}"#;

pub fn text(body: &str) -> ToolContent {
    ToolContent::new(vec![ContentBlock::text(body)])
}

pub fn tool_error(tool: &str, message: &str) -> PulseboardError {
    PulseboardError::tool_call(tool, message)
}

/// Scripted analytics server that records every tool call.
pub struct FakeSession {
    tools: Vec<String>,
    handler: ToolHandler,
    prompts: Vec<String>,
    prompt_messages: Vec<String>,
    list_tools_error: Option<String>,
    calls: Mutex<Vec<(String, JsonObject)>>,
    prompt_requests: Mutex<Vec<(String, JsonObject)>>,
}

impl FakeSession {
    pub fn new<F>(tools: &[&str], handler: F) -> Self
    where
        F: Fn(&str, &JsonObject) -> Result<ToolContent> + Send + Sync + 'static,
    {
        Self {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            handler: Box::new(handler),
            prompts: vec!["Create Dashboard".to_string()],
            prompt_messages: vec!["Lay the dashboard out as four panels.".to_string()],
            list_tools_error: None,
            calls: Mutex::new(Vec::new()),
            prompt_requests: Mutex::new(Vec::new()),
        }
    }

    /// Every Umami tool advertised, all answering successfully.
    pub fn healthy() -> Self {
        Self::new(
            &[
                "get_websites",
                "get_website_stats",
                "get_pageview_series",
                "get_website_metrics",
                "get_active_visitors",
            ],
            |tool, _| match tool {
                "get_websites" => Ok(text(WEBSITES_JSON)),
                other => Ok(text(&format!("{{\"tool\":\"{}\"}}", other))),
            },
        )
    }

    pub fn with_prompts(mut self, prompts: &[&str], messages: &[&str]) -> Self {
        self.prompts = prompts.iter().map(|p| p.to_string()).collect();
        self.prompt_messages = messages.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn failing_list_tools(mut self, message: &str) -> Self {
        self.list_tools_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, JsonObject)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_tools(&self) -> Vec<String> {
        self.calls().into_iter().map(|(name, _)| name).collect()
    }

    pub fn prompt_requests(&self) -> Vec<(String, JsonObject)> {
        self.prompt_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalyticsSession for FakeSession {
    async fn list_tools(&self) -> Result<Vec<String>> {
        match &self.list_tools_error {
            Some(message) => Err(PulseboardError::Protocol(message.clone())),
            None => Ok(self.tools.clone()),
        }
    }

    async fn call_tool(&self, name: &str, arguments: JsonObject) -> Result<ToolContent> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        (self.handler)(name, &arguments)
    }

    async fn list_prompts(&self) -> Result<Vec<String>> {
        Ok(self.prompts.clone())
    }

    async fn get_prompt(&self, name: &str, arguments: JsonObject) -> Result<Vec<String>> {
        self.prompt_requests
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        Ok(self.prompt_messages.clone())
    }
}

/// Provider that answers every prompt with the same text and counts calls.
pub struct CountingProvider {
    name: &'static str,
    reply: std::result::Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl CountingProvider {
    pub fn replying(name: &'static str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Ok(reply.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &'static str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for CountingProvider {
    async fn generate(&self, prompt: &str) -> LLMResult<LLMResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(LLMResponse {
                content: text.clone(),
                model: "counting".to_string(),
            }),
            Err(message) => Err(PulseboardError::Backend(message.clone())),
        }
    }

    fn provider_name(&self) -> &str {
        self.name
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

pub fn chain_of(providers: Vec<Arc<CountingProvider>>) -> ProviderChain {
    ProviderChain::new(
        providers
            .into_iter()
            .map(|p| p as Arc<dyn LLMProvider>)
            .collect(),
    )
}

pub fn string_arg<'a>(args: &'a JsonObject, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}
