//! Global error type for the chat widget.
//!
//! All error categories across the workspace are unified into a single
//! `CwError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using CwError.
pub type CwResult<T> = Result<T, CwError>;

/// Unified error type covering all error categories in the widget.
#[derive(Error, Debug)]
pub enum CwError {
    // -- Configuration errors --
    /// Failed to load or parse configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Endpoint errors --
    /// The realtime endpoint could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The endpoint uses a scheme the realtime transport cannot speak.
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),

    // -- Transport errors --
    /// Realtime connection error.
    #[error("socket error: {0}")]
    Socket(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// A host-side failure outside the widget protocol (logging setup,
    /// interactive prompts).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CwError {
    fn from(e: serde_json::Error) -> Self {
        CwError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for CwError {
    fn from(e: toml::de::Error) -> Self {
        CwError::Config(e.to_string())
    }
}
