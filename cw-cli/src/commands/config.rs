//! Config commands.

use std::path::Path;

use clap::Subcommand;
use console::style;
use dialoguer::Input;

use cw_core::config::AppConfig;
use cw_core::error::{CwError, CwResult};
use cw_socket::Endpoint;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
    /// Create a configuration file.
    Init {
        /// Realtime endpoint.
        #[arg(long)]
        api_url: Option<String>,
        /// Room key.
        #[arg(long)]
        room_key: Option<String>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
        /// Accept defaults instead of prompting.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Run a config subcommand.
pub fn run(
    config: &AppConfig,
    config_path: &Path,
    action: ConfigAction,
    format: OutputFormat,
) -> CwResult<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", render(config, format)?);
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
        ConfigAction::Init {
            api_url,
            room_key,
            force,
            yes,
        } => {
            if config_path.exists() && !force {
                return Err(CwError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                )));
            }

            let api_url = match api_url {
                Some(url) => url,
                None if yes => config.widget.api_url.clone(),
                None => prompt("Realtime endpoint", &config.widget.api_url)?,
            };
            let room_key = match room_key {
                Some(key) => key,
                None if yes => config.widget.room_key.clone(),
                None => prompt("Room key", &config.widget.room_key)?,
            };

            let created = init_config(config, config_path, &api_url, &room_key)?;
            println!(
                "  {} Config written to {}",
                style("OK").green().bold(),
                config_path.display()
            );
            println!("  Endpoint: {}", Endpoint::new(&created.widget.api_url, &created.widget.room_key)?);
            Ok(())
        }
    }
}

/// Serialize the configuration for display.
fn render(config: &AppConfig, format: OutputFormat) -> CwResult<String> {
    match format {
        OutputFormat::Text => toml::to_string_pretty(config)
            .map_err(|e| CwError::Serialization(format!("failed to render config: {e}"))),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
    }
}

fn prompt(label: &str, default: &str) -> CwResult<String> {
    Input::new()
        .with_prompt(label)
        .default(default.to_string())
        .interact_text()
        .map_err(|e| CwError::Internal(e.to_string()))
}

/// Validate the endpoint settings and write a new config file.
fn init_config(base: &AppConfig, path: &Path, api_url: &str, room_key: &str) -> CwResult<AppConfig> {
    // Reject what the widget could never connect to
    Endpoint::new(api_url, room_key)?;

    let mut config = base.clone();
    config.widget.api_url = api_url.trim().to_string();
    config.widget.room_key = room_key.trim().to_string();
    config.save_to_file(path)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config(&AppConfig::default(), &path, "https://chat.example.com/ws", "tenant_123").unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.widget.api_url, "https://chat.example.com/ws");
        assert_eq!(loaded.widget.room_key, "tenant_123");
    }

    #[test]
    fn test_init_rejects_unsupported_scheme() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let result = init_config(&AppConfig::default(), &path, "ftp://chat.example.com", "r");

        assert!(matches!(result, Err(CwError::UnsupportedScheme(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let action = ConfigAction::Init {
            api_url: Some("ws://localhost:8000/v1/ws/chat".into()),
            room_key: Some("r".into()),
            force: false,
            yes: true,
        };
        let result = run(&AppConfig::default(), &path, action, OutputFormat::Text);

        assert!(matches!(result, Err(CwError::Config(_))));
    }

    #[test]
    fn test_render_formats() {
        let config = AppConfig::default();

        let text = render(&config, OutputFormat::Text).unwrap();
        assert!(text.contains("[widget]"));

        let json: serde_json::Value =
            serde_json::from_str(&render(&config, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["widget"]["roomKey"], "default");
    }
}
