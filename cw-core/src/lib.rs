//! Shared foundation for the chat widget crates.
//!
//! Configuration, the error type, tracing setup, host-environment lookups and
//! the default values the widget ships with.

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;

pub use config::{AppConfig, ColorScheme, Theme, ThemePreference, WidgetConfig};
pub use error::{CwError, CwResult};
pub use logging::init_logging;
pub use platform::Platform;
