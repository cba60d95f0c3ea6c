use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseboardError {
    /// A required setting (usually a secret) is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A text-generation backend failed.
    #[error("{0}")]
    Backend(String),

    #[error("Tool call '{tool}' failed: {message}")]
    ToolCall { tool: String, message: String },

    #[error("Could not resolve website: {0}")]
    Resolution(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PulseboardError {
    pub fn tool_call(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::ToolCall {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    /// Configuration errors are never retried against another backend.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, PulseboardError>;
