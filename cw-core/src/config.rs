//! Widget configuration management.
//!
//! Handles loading, saving, and accessing the configuration supplied by the
//! embedding host: realtime endpoint, room key, theme, keep-alive interval,
//! reconnection policy and presentation tuning. Configuration is persisted as
//! TOML on disk; the embedding-page object is accepted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{CwError, CwResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Options recognized from the embedding page.
    #[serde(default)]
    pub widget: WidgetConfig,

    /// Reconnection policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Rate limiting and rendering tunables.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Options supplied by the embedding page.
///
/// Keys use the page's camelCase names (`apiUrl`, `roomKey`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    /// Realtime endpoint. `http(s)` schemes are normalized to `ws(s)`.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Tenant/room identifier sent on every connect attempt.
    #[serde(default = "default_room_key")]
    pub room_key: String,

    /// Color theme preference.
    #[serde(default)]
    pub theme: ThemePreference,

    /// Keep-alive interval in milliseconds.
    #[serde(default = "default_heartbeat")]
    pub heartbeat: u64,

    /// Show the thumbs-up/down affordance on bot replies.
    #[serde(default = "default_true")]
    pub enable_feedback: bool,

    /// Text shown once after the first successful connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
}

/// Reconnection policy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
    /// Delay unit of the linear backoff (`base * attempt`).
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Attempts allowed before the session is closed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Random jitter (0.0 to 1.0) added on top of the linear delay.
    #[serde(default)]
    pub jitter_factor: f64,
}

/// Session tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Minimum spacing between accepted outbound sends.
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,

    /// Delay between revealed characters of a streamed reply.
    #[serde(default = "default_stream_char_delay")]
    pub stream_char_delay_ms: u64,

    /// Capacity of the session event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

/// Theme preference as configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    /// Follow the host's color-scheme preference at open time.
    #[default]
    Auto,
    Light,
    Dark,
}

/// Color scheme reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    Light,
    Dark,
}

/// Concrete theme applied to an open widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl ThemePreference {
    /// Resolve to a concrete theme. `Auto` follows the host preference.
    pub fn resolve(self, system: ColorScheme) -> Theme {
        match self {
            Self::Light => Theme::Light,
            Self::Dark => Theme::Dark,
            Self::Auto => match system {
                ColorScheme::Light => Theme::Light,
                ColorScheme::Dark => Theme::Dark,
            },
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl std::str::FromStr for ThemePreference {
    type Err = CwError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(CwError::Config(format!("unknown theme: {other}"))),
        }
    }
}

// Default value functions for serde

fn default_api_url() -> String {
    constants::DEFAULT_API_URL.to_string()
}

fn default_room_key() -> String {
    constants::DEFAULT_ROOM_KEY.to_string()
}

fn default_heartbeat() -> u64 {
    constants::DEFAULT_HEARTBEAT_MS
}

fn default_true() -> bool {
    true
}

fn default_base_delay() -> u64 {
    constants::DEFAULT_RECONNECT_BASE_DELAY_MS
}

fn default_max_attempts() -> u32 {
    constants::DEFAULT_MAX_RECONNECT_ATTEMPTS
}

fn default_send_interval() -> u64 {
    constants::DEFAULT_SEND_INTERVAL_MS
}

fn default_stream_char_delay() -> u64 {
    constants::DEFAULT_STREAM_CHAR_DELAY_MS
}

fn default_event_capacity() -> usize {
    constants::DEFAULT_EVENT_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            room_key: default_room_key(),
            theme: ThemePreference::Auto,
            heartbeat: default_heartbeat(),
            enable_feedback: true,
            welcome_message: None,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            max_attempts: default_max_attempts(),
            jitter_factor: 0.0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval(),
            stream_char_delay_ms: default_stream_char_delay(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl WidgetConfig {
    /// Room key to connect with; blank values fall back to `"default"`.
    pub fn effective_room_key(&self) -> &str {
        let trimmed = self.room_key.trim();
        if trimmed.is_empty() {
            constants::DEFAULT_ROOM_KEY
        } else {
            trimmed
        }
    }

    /// Keep-alive interval. A zero heartbeat falls back to the default.
    pub fn heartbeat_interval(&self) -> std::time::Duration {
        let ms = if self.heartbeat == 0 {
            constants::DEFAULT_HEARTBEAT_MS
        } else {
            self.heartbeat
        };
        std::time::Duration::from_millis(ms)
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> CwResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> CwResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Build a configuration from an embedding-page options object.
    ///
    /// Only the widget section is read; everything else keeps its defaults.
    pub fn from_json(json: &str) -> CwResult<Self> {
        let widget: WidgetConfig = serde_json::from_str(json)?;
        Ok(Self {
            widget,
            ..Self::default()
        })
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> CwResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CwError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> CwResult<PathBuf> {
        let config_dir = Platform::config_dir()?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> CwResult<PathBuf> {
        if self.logging.directory.is_empty() {
            let data_dir = Platform::data_dir()?;
            Ok(data_dir.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }
}
