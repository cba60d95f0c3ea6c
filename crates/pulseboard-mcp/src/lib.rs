pub mod chat;
pub mod collector;
pub mod orchestrator;
pub mod prompts;
pub mod session;

pub use chat::{is_exit_command, ChatInput, ChatSession, ChatSummary};
pub use collector::{collect, resolve_website_id, CollectionRequest};
pub use orchestrator::{
    DashboardContext, DashboardOrchestrator, DashboardRequest, RunOutcome, RunStage,
};
pub use prompts::{dashboard_prompt_arguments, render_chat_prompt, render_dashboard_prompt};
pub use session::{AnalyticsSession, ContentBlock, JsonObject, RmcpSession, ServerProcess, ToolContent};
