// ABOUTME: Drives one dashboard run from MCP connection through generation, audit and chat.
// ABOUTME: Each stage failure is printed and ends the run; the MCP session is always closed.

use crate::chat::{ChatInput, ChatSession, ChatSummary};
use crate::collector::{collect, CollectionRequest};
use crate::prompts::{dashboard_prompt_arguments, render_dashboard_prompt};
use crate::session::{AnalyticsSession, ServerProcess};
use colored::Colorize;
use pulseboard_ai::{GeneratedResponse, HallucinationReport, ProviderChain};
use pulseboard_core::{AnalyticsSnapshot, PulseboardConfig, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Progress of a run, in the order stages are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Idle,
    Connected,
    Initialized,
    DataCollected,
    PromptRendered,
    ResponseGenerated,
    Audited,
    ChatLoop,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Idle => "idle",
            RunStage::Connected => "connected",
            RunStage::Initialized => "initialized",
            RunStage::DataCollected => "data-collected",
            RunStage::PromptRendered => "prompt-rendered",
            RunStage::ResponseGenerated => "response-generated",
            RunStage::Audited => "audited",
            RunStage::ChatLoop => "chat-loop",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRequest {
    pub target: CollectionRequest,
    pub chat: bool,
}

/// State carried between stages of a single run.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub request: DashboardRequest,
    pub snapshot: AnalyticsSnapshot,
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Furthest stage reached; `Done` only when nothing failed.
    pub stage: RunStage,
    pub snapshot: Option<AnalyticsSnapshot>,
    pub dashboard: Option<GeneratedResponse>,
    pub report: Option<HallucinationReport>,
    pub chat: Option<ChatSummary>,
    pub failure: Option<String>,
}

impl RunOutcome {
    fn new() -> Self {
        Self {
            stage: RunStage::Idle,
            snapshot: None,
            dashboard: None,
            report: None,
            chat: None,
            failure: None,
        }
    }

    fn advance(&mut self, stage: RunStage) {
        debug!("run stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn fail(mut self, message: String) -> Self {
        println!("{}", message.red());
        self.failure = Some(message);
        self
    }

    pub fn is_complete(&self) -> bool {
        self.stage == RunStage::Done
    }
}

pub struct DashboardOrchestrator {
    config: PulseboardConfig,
    chain: ProviderChain,
}

impl DashboardOrchestrator {
    pub fn new(config: PulseboardConfig, chain: ProviderChain) -> Self {
        Self { config, chain }
    }

    /// Launch the configured MCP server and run against it, reading chat
    /// questions from stdin and stopping the chat on Ctrl-C.
    pub async fn run(&self, request: &DashboardRequest) -> RunOutcome {
        let mut outcome = RunOutcome::new();
        let call_timeout = Duration::from_secs(self.config.collector.tool_timeout_secs);

        let process = match ServerProcess::spawn(&self.config.mcp_server, call_timeout) {
            Ok(process) => process,
            Err(e) => return outcome.fail(format!("❌ Error in dashboard creation: {}", e)),
        };
        println!("{}", "✅ Connected to MCP server".green());
        outcome.advance(RunStage::Connected);

        let session = match process.initialize().await {
            Ok(session) => session,
            Err(e) => return outcome.fail(format!("❌ Initialization error: {}", e)),
        };
        println!("{}", "✅ Session initialized".green());
        outcome.advance(RunStage::Initialized);

        let chat_input = if request.chat {
            ChatInput::stdin()
        } else {
            ChatInput::closed()
        };
        let interrupt = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        let outcome = self
            .drive(&session, request, chat_input, interrupt, outcome)
            .await;

        session.close().await;
        outcome
    }

    /// Run every stage after the handshake against an existing session.
    pub async fn run_with_session<S, I>(
        &self,
        session: &S,
        request: &DashboardRequest,
        chat_input: ChatInput,
        interrupt: I,
    ) -> RunOutcome
    where
        S: AnalyticsSession + ?Sized,
        I: Future<Output = ()>,
    {
        let mut outcome = RunOutcome::new();
        outcome.advance(RunStage::Initialized);
        self.drive(session, request, chat_input, interrupt, outcome)
            .await
    }

    async fn drive<S, I>(
        &self,
        session: &S,
        request: &DashboardRequest,
        chat_input: ChatInput,
        interrupt: I,
        mut outcome: RunOutcome,
    ) -> RunOutcome
    where
        S: AnalyticsSession + ?Sized,
        I: Future<Output = ()>,
    {
        println!(
            "\n📊 Getting real data for {}...",
            request.target.website_domain
        );
        let context = DashboardContext {
            request: request.clone(),
            snapshot: collect(session, &request.target).await,
        };
        outcome.snapshot = Some(context.snapshot.clone());
        outcome.advance(RunStage::DataCollected);

        let dashboard = match self.generate_dashboard(session, &context, &mut outcome).await {
            Ok(Some(dashboard)) => dashboard,
            Ok(None) => return outcome,
            Err(e) => return outcome.fail(format!("❌ Error with prompts: {}", e)),
        };

        println!(
            "\n{}",
            format!(
                "📈 DASHBOARD ANALYSIS ({}):",
                dashboard.provider.to_uppercase()
            )
            .bold()
        );
        println!("{}", "=".repeat(80));
        println!("{}", dashboard.text);
        println!("{}", "=".repeat(80));

        let report = HallucinationReport::from_text(&dashboard.text);
        if report.is_clean() {
            println!(
                "\n{}",
                "✅ Analysis appears to be based on real data".green()
            );
        } else {
            println!(
                "\n{}",
                format!("⚠️  Potential data fabrication detected: {}", report).yellow()
            );
        }
        outcome.dashboard = Some(dashboard);
        outcome.report = Some(report);
        outcome.advance(RunStage::Audited);

        if context.request.chat {
            outcome.advance(RunStage::ChatLoop);
            let chat = ChatSession::new(&self.chain, &context.snapshot);
            outcome.chat = Some(chat.run(chat_input, interrupt).await);
        }

        outcome.advance(RunStage::Done);
        outcome
    }

    /// Fetch the server's guide, render the dashboard prompt and generate.
    ///
    /// `Ok(None)` means the run ended with a message already printed.
    async fn generate_dashboard<S>(
        &self,
        session: &S,
        context: &DashboardContext,
        outcome: &mut RunOutcome,
    ) -> Result<Option<GeneratedResponse>>
    where
        S: AnalyticsSession + ?Sized,
    {
        let prompt_name = &self.config.mcp_server.dashboard_prompt;

        let prompts = session.list_prompts().await?;
        println!("📋 Available prompts: {:?}", prompts);

        if !prompts.iter().any(|p| p == prompt_name) {
            let message = format!("❌ '{}' prompt not available", prompt_name);
            println!("{}", message.red());
            outcome.failure = Some(message);
            return Ok(None);
        }

        let messages = session
            .get_prompt(
                prompt_name,
                dashboard_prompt_arguments(&context.request.target),
            )
            .await?;
        let guide = match messages.into_iter().next() {
            Some(guide) => guide,
            None => {
                let message = "❌ No content in prompt result".to_string();
                println!("{}", message.red());
                outcome.failure = Some(message);
                return Ok(None);
            }
        };

        let prompt = render_dashboard_prompt(&guide, &context.snapshot);
        debug!("dashboard prompt:\n{}", prompt);
        outcome.advance(RunStage::PromptRendered);

        println!("\n🤖 Generating dashboard with AI...");
        let dashboard = self.chain.generate(&prompt).await?;
        info!("Dashboard generated by {}", dashboard.provider);
        outcome.advance(RunStage::ResponseGenerated);

        Ok(Some(dashboard))
    }
}
