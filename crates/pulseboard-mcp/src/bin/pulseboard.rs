use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::*;
use pulseboard_ai::ProviderChain;
use pulseboard_core::config_manager::ConfigManager;
use pulseboard_mcp::{CollectionRequest, DashboardOrchestrator, DashboardRequest};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

#[derive(Parser)]
#[command(
    name = "pulseboard",
    version,
    author,
    about = "Analytics dashboard generator backed by an Umami MCP server",
    long_about = "Pulseboard collects real analytics through an MCP server, asks a hosted model \
                  (Cloudflare Workers AI, falling back to a local ollama model) for a dashboard \
                  analysis, and flags phrases that suggest invented numbers."
)]
struct Cli {
    #[arg(
        long,
        help = "Path to MCP server directory (overrides PULSEBOARD_MCP_SERVER_DIR)"
    )]
    mcp_server_dir: Option<PathBuf>,

    #[arg(long, default_value = "example.com", help = "Website domain to analyze")]
    website: String,

    #[arg(
        long,
        default_value = "2025-06-01",
        value_parser = parse_date,
        help = "Start date (YYYY-MM-DD)"
    )]
    start_date: String,

    #[arg(
        long,
        default_value = "2025-07-01",
        value_parser = parse_date,
        help = "End date (YYYY-MM-DD)"
    )]
    end_date: String,

    #[arg(long, default_value = "UTC", help = "Timezone for analysis")]
    timezone: String,

    #[arg(long, help = "Enable interactive chat mode after generating report")]
    chat: bool,

    #[arg(long, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(long, help = "Cloudflare Workers AI model")]
    cloudflare_model: Option<String>,

    #[arg(long, help = "Local ollama model used as fallback")]
    ollama_model: Option<String>,
}

fn parse_date(value: &str) -> std::result::Result<String, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| value.to_string())
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

fn init_logging(level: &str, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    let subscriber = Registry::default()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is read by ConfigManager, after the CLI is parsed.
    let cli = Cli::parse();

    let mut config_mgr =
        ConfigManager::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    {
        let config = config_mgr.config_mut();
        if let Some(dir) = cli.mcp_server_dir.clone() {
            config.mcp_server.directory = Some(dir);
        }
        if let Some(model) = cli.cloudflare_model.clone() {
            config.cloudflare.model = model;
        }
        if let Some(model) = cli.ollama_model.clone() {
            config.ollama.model = model;
        }
    }
    let config = config_mgr.config().clone();

    init_logging(&config.logging.level, cli.verbose);
    if let Some(path) = config_mgr.config_path() {
        debug!("Using configuration from {}", path.display());
    }

    println!("{}", "🚀 Starting Analytics Dashboard".bold());
    println!("   Website: {}", cli.website);
    println!("   Date Range: {} to {}", cli.start_date, cli.end_date);
    println!("   Timezone: {}", cli.timezone);
    println!(
        "   Chat Mode: {}",
        if cli.chat { "Enabled" } else { "Disabled" }
    );
    println!();

    let chain = ProviderChain::from_config(&config).context("Failed to set up AI providers")?;
    info!("AI providers: {}", chain.provider_names().join(" -> "));

    let request = DashboardRequest {
        target: CollectionRequest {
            website_domain: cli.website,
            start_date: cli.start_date,
            end_date: cli.end_date,
            timezone: cli.timezone,
        },
        chat: cli.chat,
    };

    let outcome = DashboardOrchestrator::new(config, chain).run(&request).await;
    debug!(
        "Run finished at stage {} ({})",
        outcome.stage,
        outcome.failure.as_deref().unwrap_or("no failure")
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["pulseboard"]).unwrap();
        assert_eq!(cli.website, "example.com");
        assert_eq!(cli.start_date, "2025-06-01");
        assert_eq!(cli.end_date, "2025-07-01");
        assert_eq!(cli.timezone, "UTC");
        assert!(!cli.chat);
    }

    #[test]
    fn server_dir_flag_is_cli_only() {
        // The environment variable is applied by ConfigManager, not by clap.
        std::env::set_var("PULSEBOARD_MCP_SERVER_DIR", "/from/env");
        let cli = Cli::try_parse_from(["pulseboard"]).unwrap();
        std::env::remove_var("PULSEBOARD_MCP_SERVER_DIR");
        assert!(cli.mcp_server_dir.is_none());

        let cli = Cli::try_parse_from(["pulseboard", "--mcp-server-dir", "/srv/mcp"]).unwrap();
        assert_eq!(cli.mcp_server_dir, Some(PathBuf::from("/srv/mcp")));
    }

    #[test]
    fn dates_are_validated() {
        assert!(Cli::try_parse_from(["pulseboard", "--start-date", "06/01/2025"]).is_err());
        let cli = Cli::try_parse_from([
            "pulseboard",
            "--website",
            "blog.example.org",
            "--end-date",
            "2025-08-31",
            "--chat",
        ])
        .unwrap();
        assert_eq!(cli.website, "blog.example.org");
        assert_eq!(cli.end_date, "2025-08-31");
        assert!(cli.chat);
    }
}
