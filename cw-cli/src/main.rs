//! ChatWidget CLI - terminal host for the chat widget session client.
//!
//! Opens a widget session against a realtime chat backend and renders it in
//! the terminal: connection state, typing indicator and streamed replies.
//! Also manages the configuration file the widget reads.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use cw_core::config::AppConfig;
use cw_core::error::CwResult;
use cw_core::logging;

/// ChatWidget - realtime chat widget client.
#[derive(Parser)]
#[command(
    name = "chatwidget",
    version,
    about = "Chat widget realtime client CLI",
    long_about = "A terminal host for the chat widget.\n\
                   Connects to a chat backend over WebSocket and renders the conversation."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a chat session and talk to the backend.
    Chat {
        /// Realtime endpoint (overrides config).
        #[arg(short, long)]
        url: Option<String>,
        /// Room key (overrides config).
        #[arg(short, long)]
        room: Option<String>,
        /// Theme: auto, light or dark (overrides config).
        #[arg(short, long)]
        theme: Option<String>,
    },
    /// View and create the configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> CwResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = match cli.config.as_deref() {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_config_path().unwrap_or_else(|_| PathBuf::from("config.toml")),
    };
    let config = if config_path.exists() {
        AppConfig::load_from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    // Initialize logging
    let _guard = logging::init_logging(&config, cli.verbose)?;

    info!("ChatWidget CLI v{}", cw_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Chat { url, room, theme } => commands::chat::run(config, url, room, theme).await,
        Commands::Config { action } => {
            commands::config::run(&config, &config_path, action, cli.format)
        }
    }
}
