use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Provider names understood by the generation gateway, in default order.
pub const SUPPORTED_PROVIDERS: &[&str] = &["cloudflare", "ollama"];

/// Environment variables passed through to the analytics MCP server process.
pub const FORWARDED_ENV_KEYS: &[&str] = &[
    "TOKENIZERS_PARALLELISM",
    "UMAMI_API_URL",
    "UMAMI_USERNAME",
    "UMAMI_PASSWORD",
    "UMAMI_TEAM_ID",
];

/// Main configuration for Pulseboard
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PulseboardConfig {
    /// Provider ordering for text generation
    #[serde(default)]
    pub ai: AiConfig,

    /// Hosted inference (Cloudflare Workers AI)
    #[serde(default)]
    pub cloudflare: CloudflareConfig,

    /// Local fallback (ollama CLI)
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Analytics MCP server launch settings
    #[serde(default)]
    pub mcp_server: McpServerConfig,

    /// Data collection settings
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Text-generation provider selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Providers tried in order: "cloudflare", "ollama"
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
        }
    }
}

/// Cloudflare Workers AI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    /// Account identifier (CLOUDFLARE_ACCOUNT_ID)
    #[serde(default)]
    pub account_id: Option<String>,

    /// API token (CLOUDFLARE_API_TOKEN)
    #[serde(default)]
    pub api_token: Option<String>,

    /// Model path, e.g. "@cf/meta/llama-3.1-8b-instruct"
    #[serde(default = "default_cloudflare_model")]
    pub model: String,

    #[serde(default = "default_cloudflare_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            account_id: None,
            api_token: None,
            model: default_cloudflare_model(),
            base_url: default_cloudflare_base_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Local ollama CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Executable name or path
    #[serde(default = "default_ollama_binary")]
    pub binary: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Upper bound on one generation, in seconds
    #[serde(default = "default_ollama_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            binary: default_ollama_binary(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout_secs(),
        }
    }
}

/// How the analytics MCP server is launched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Launcher executable ("uv")
    #[serde(default = "default_mcp_command")]
    pub command: String,

    /// Project directory of the MCP server (`uv --directory <dir>`)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Entry point run inside the project
    #[serde(default = "default_mcp_service")]
    pub service: String,

    /// Name of the server-side prompt that holds the dashboard guide
    #[serde(default = "default_dashboard_prompt")]
    pub dashboard_prompt: String,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            command: default_mcp_command(),
            directory: None,
            service: default_mcp_service(),
            dashboard_prompt: default_dashboard_prompt(),
        }
    }
}

impl McpServerConfig {
    /// Launcher arguments: `--directory <dir> run <service>`
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(dir) = &self.directory {
            args.push("--directory".to_string());
            args.push(dir.to_string_lossy().to_string());
        }
        args.push("run".to_string());
        args.push(self.service.clone());
        args
    }

    /// Allow-listed variables from the current process environment.
    pub fn forwarded_environment(&self) -> Vec<(String, String)> {
        Self::forwarded_environment_from(|key| std::env::var(key).ok())
    }

    /// Allow-listed variables resolved through `lookup`.
    /// TOKENIZERS_PARALLELISM defaults to "false" when unset.
    pub fn forwarded_environment_from<F>(lookup: F) -> Vec<(String, String)>
    where
        F: Fn(&str) -> Option<String>,
    {
        FORWARDED_ENV_KEYS
            .iter()
            .filter_map(|key| {
                let value = lookup(key).or_else(|| {
                    (*key == "TOKENIZERS_PARALLELISM").then(|| "false".to_string())
                })?;
                Some((key.to_string(), value))
            })
            .collect()
    }
}

/// Data collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Upper bound on a single tool call, in seconds
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_providers() -> Vec<String> {
    SUPPORTED_PROVIDERS.iter().map(|p| p.to_string()).collect()
}
fn default_cloudflare_model() -> String {
    "@cf/meta/llama-3.1-8b-instruct".to_string()
}
fn default_cloudflare_base_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}
fn default_max_tokens() -> usize {
    2048
}
fn default_temperature() -> f32 {
    0.1
}
fn default_http_timeout_secs() -> u64 {
    120
}
fn default_ollama_binary() -> String {
    "ollama".to_string()
}
fn default_ollama_model() -> String {
    "llama3.2".to_string()
}
fn default_ollama_timeout_secs() -> u64 {
    300
}
fn default_mcp_command() -> String {
    "uv".to_string()
}
fn default_mcp_service() -> String {
    "analytics-service".to_string()
}
fn default_dashboard_prompt() -> String {
    "Create Dashboard".to_string()
}
fn default_tool_timeout_secs() -> u64 {
    60
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration manager with layered loading
pub struct ConfigManager {
    config: PulseboardConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (explicit path, ./.pulseboard.toml, ~/.pulseboard/config.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Same as [`ConfigManager::load`], preferring `explicit` when given.
    pub fn load_from(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_dotenv(Path::new(".env"));

        let (config, config_path) = Self::load_config_file(explicit)?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        info!("✅ Configuration loaded");
        match config_path {
            Some(ref path) => info!("   📄 Config file: {}", path.display()),
            None => info!("   📄 Config file: NONE (using defaults)"),
        }
        info!("   🤖 Providers: {}", config.ai.providers.join(" → "));
        info!("   ☁️  Cloudflare model: {}", config.cloudflare.model);
        info!("   🦙 Ollama model: {}", config.ollama.model);

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Wrap an already-built configuration after validating it.
    pub fn from_config(config: PulseboardConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    /// The only place `.env` is read. Variables already set in the process win.
    fn load_dotenv(path: &Path) {
        if path.exists() {
            if let Err(e) = dotenv::from_path(path) {
                warn!("Failed to load {}: {}", path.display(), e);
            } else {
                info!("📋 Loaded {}", path.display());
            }
        }
    }

    fn load_config_file(
        explicit: Option<&Path>,
    ) -> Result<(PulseboardConfig, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            let config = Self::read_toml_file(path)?;
            return Ok((config, Some(path.to_path_buf())));
        }

        let local_config = Path::new(".pulseboard.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".pulseboard").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((PulseboardConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<PulseboardConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: PulseboardConfig) -> PulseboardConfig {
        Self::apply_overrides_from(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides resolved through `lookup`; empty values are ignored.
    pub fn apply_overrides_from<F>(mut config: PulseboardConfig, lookup: F) -> PulseboardConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Cloudflare secrets
        if let Some(account) = var("CLOUDFLARE_ACCOUNT_ID") {
            config.cloudflare.account_id = Some(account);
        }
        if let Some(token) = var("CLOUDFLARE_API_TOKEN") {
            config.cloudflare.api_token = Some(token);
        }
        if let Some(model) = var("PULSEBOARD_CLOUDFLARE_MODEL") {
            config.cloudflare.model = model;
        }

        // Ollama
        if let Some(binary) = var("PULSEBOARD_OLLAMA_BIN") {
            config.ollama.binary = binary;
        }
        if let Some(model) = var("PULSEBOARD_OLLAMA_MODEL") {
            config.ollama.model = model;
        }

        // Provider order
        if let Some(providers) = var("PULSEBOARD_PROVIDERS") {
            config.ai.providers = providers
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
        }

        // MCP server
        if let Some(dir) = var("PULSEBOARD_MCP_SERVER_DIR") {
            config.mcp_server.directory = Some(PathBuf::from(dir));
        }
        if let Some(secs) = var("PULSEBOARD_TOOL_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.collector.tool_timeout_secs = secs;
            }
        }

        if let Some(level) = var("PULSEBOARD_LOG_LEVEL") {
            config.logging.level = level.to_lowercase();
        }

        config
    }

    /// Validate configuration
    pub fn validate_config(config: &PulseboardConfig) -> Result<(), ConfigError> {
        if config.ai.providers.is_empty() {
            return Err(ConfigError::ValidationError(
                "At least one provider must be configured".to_string(),
            ));
        }
        for provider in &config.ai.providers {
            if !SUPPORTED_PROVIDERS.contains(&provider.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid provider: {}. Must be one of: {}",
                    provider,
                    SUPPORTED_PROVIDERS.join(", ")
                )));
            }
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    other
                )))
            }
        }

        if config.cloudflare.timeout_secs == 0
            || config.ollama.timeout_secs == 0
            || config.collector.tool_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "Timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PulseboardConfig {
        &self.config
    }

    /// Mutable access for command-line overrides applied after loading.
    pub fn config_mut(&mut self) -> &mut PulseboardConfig {
        &mut self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PulseboardConfig::default();
        assert_eq!(config.ai.providers, vec!["cloudflare", "ollama"]);
        assert_eq!(config.cloudflare.model, "@cf/meta/llama-3.1-8b-instruct");
        assert_eq!(config.cloudflare.max_tokens, 2048);
        assert_eq!(config.ollama.model, "llama3.2");
        assert_eq!(config.mcp_server.dashboard_prompt, "Create Dashboard");
        assert!(config.cloudflare.account_id.is_none());
    }

    #[test]
    fn test_config_validation() {
        let config = PulseboardConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad = config.clone();
        bad.ai.providers = vec!["openai".to_string()];
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut empty = config.clone();
        empty.ai.providers.clear();
        assert!(ConfigManager::validate_config(&empty).is_err());

        let mut level = config;
        level.logging.level = "loud".to_string();
        assert!(ConfigManager::validate_config(&level).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("CLOUDFLARE_ACCOUNT_ID", "acct-1"),
            ("CLOUDFLARE_API_TOKEN", ""),
            ("PULSEBOARD_PROVIDERS", "Ollama, cloudflare"),
            ("PULSEBOARD_TOOL_TIMEOUT_SECS", "15"),
        ]
        .into_iter()
        .collect();

        let config = ConfigManager::apply_overrides_from(PulseboardConfig::default(), |k| {
            env.get(k).map(|v| v.to_string())
        });

        assert_eq!(config.cloudflare.account_id.as_deref(), Some("acct-1"));
        // empty secrets are treated as unset
        assert!(config.cloudflare.api_token.is_none());
        assert_eq!(config.ai.providers, vec!["ollama", "cloudflare"]);
        assert_eq!(config.collector.tool_timeout_secs, 15);
    }

    #[test]
    fn test_launch_args() {
        let mut server = McpServerConfig::default();
        assert_eq!(server.launch_args(), vec!["run", "analytics-service"]);

        server.directory = Some(PathBuf::from("/srv/umami-mcp"));
        assert_eq!(
            server.launch_args(),
            vec!["--directory", "/srv/umami-mcp", "run", "analytics-service"]
        );
    }

    #[test]
    fn test_forwarded_environment_is_allow_listed() {
        let env: HashMap<&str, &str> = [
            ("UMAMI_API_URL", "https://umami.example.com"),
            ("UMAMI_PASSWORD", "hunter2"),
            ("CLOUDFLARE_API_TOKEN", "must-not-leak"),
        ]
        .into_iter()
        .collect();

        let forwarded = McpServerConfig::forwarded_environment_from(|k| {
            env.get(k).map(|v| v.to_string())
        });

        assert_eq!(
            forwarded,
            vec![
                ("TOKENIZERS_PARALLELISM".to_string(), "false".to_string()),
                (
                    "UMAMI_API_URL".to_string(),
                    "https://umami.example.com".to_string()
                ),
                ("UMAMI_PASSWORD".to_string(), "hunter2".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_explicit_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[ai]
providers = ["ollama"]

[ollama]
model = "mistral"

[mcp_server]
directory = "/opt/analytics-mcp"
"#
        )
        .unwrap();

        let config = ConfigManager::read_toml_file(file.path()).unwrap();
        assert_eq!(config.ai.providers, vec!["ollama"]);
        assert_eq!(config.ollama.model, "mistral");
        assert_eq!(config.ollama.binary, "ollama");
        assert_eq!(
            config.mcp_server.directory,
            Some(PathBuf::from("/opt/analytics-mcp"))
        );
        assert_eq!(config.cloudflare.temperature, 0.1);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = ConfigManager::load_config_file(Some(Path::new(
            "/definitely/not/here/pulseboard.toml",
        )));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    #[serial]
    fn test_process_env_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[ai]\nproviders = [\"ollama\"]\n").unwrap();

        std::env::set_var("PULSEBOARD_PROVIDERS", "cloudflare");
        std::env::set_var("PULSEBOARD_OLLAMA_MODEL", "qwen2.5");

        let manager = ConfigManager::load_from(Some(file.path())).unwrap();
        assert_eq!(manager.config().ai.providers, vec!["cloudflare"]);
        assert_eq!(manager.config().ollama.model, "qwen2.5");
        assert_eq!(manager.config_path(), Some(file.path()));

        // Cleanup
        std::env::remove_var("PULSEBOARD_PROVIDERS");
        std::env::remove_var("PULSEBOARD_OLLAMA_MODEL");
    }

    #[test]
    #[serial]
    fn test_invalid_env_log_level_fails_validation() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::env::set_var("PULSEBOARD_LOG_LEVEL", "chatty");

        let result = ConfigManager::load_from(Some(file.path()));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        // Cleanup
        std::env::remove_var("PULSEBOARD_LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_dotenv_values_reach_config() {
        let mut dotenv_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(dotenv_file, "PULSEBOARD_MCP_SERVER_DIR=/srv/umami-mcp").unwrap();
        let config_file = tempfile::NamedTempFile::new().unwrap();

        ConfigManager::load_dotenv(dotenv_file.path());
        let manager = ConfigManager::load_from(Some(config_file.path())).unwrap();
        assert_eq!(
            manager.config().mcp_server.directory.as_deref(),
            Some(Path::new("/srv/umami-mcp"))
        );

        // Cleanup
        std::env::remove_var("PULSEBOARD_MCP_SERVER_DIR");
    }
}
