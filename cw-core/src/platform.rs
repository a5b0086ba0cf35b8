//! Host-environment helpers: where files live and what the terminal looks like.

use std::path::PathBuf;

use crate::config::ColorScheme;
use crate::constants::APP_NAME;
use crate::error::{CwError, CwResult};

/// Namespace for host lookups.
pub struct Platform;

impl Platform {
    /// Per-user data directory, e.g. `~/.local/share/ChatWidget`.
    pub fn data_dir() -> CwResult<PathBuf> {
        app_dir(dirs::data_dir(), "data")
    }

    /// Per-user config directory, e.g. `~/.config/ChatWidget`.
    pub fn config_dir() -> CwResult<PathBuf> {
        app_dir(dirs::config_dir(), "config")
    }

    /// Color scheme preferred by the hosting terminal.
    ///
    /// Reads `COLORFGBG` (`"fg;bg"`); unknown or missing values mean light.
    pub fn preferred_color_scheme() -> ColorScheme {
        std::env::var("COLORFGBG")
            .ok()
            .and_then(|value| color_scheme_from_fgbg(&value))
            .unwrap_or(ColorScheme::Light)
    }
}

fn app_dir(base: Option<PathBuf>, kind: &str) -> CwResult<PathBuf> {
    base.map(|dir| dir.join(APP_NAME))
        .ok_or_else(|| CwError::Config(format!("could not determine {kind} directory")))
}

/// Interpret a `COLORFGBG` value. Background indices 0-6 and 8 are dark.
fn color_scheme_from_fgbg(value: &str) -> Option<ColorScheme> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    match bg {
        0..=6 | 8 => Some(ColorScheme::Dark),
        _ => Some(ColorScheme::Light),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_dir_appends_app_name() {
        let dir = app_dir(Some(PathBuf::from("/tmp/base")), "data").unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/base").join(APP_NAME));
    }

    #[test]
    fn test_app_dir_missing_base() {
        let err = app_dir(None, "config").unwrap_err();
        assert!(err.to_string().contains("config directory"));
    }

    #[test]
    fn test_colorfgbg_parsing() {
        assert_eq!(color_scheme_from_fgbg("15;0"), Some(ColorScheme::Dark));
        assert_eq!(color_scheme_from_fgbg("0;default;8"), Some(ColorScheme::Dark));
        assert_eq!(color_scheme_from_fgbg("0;15"), Some(ColorScheme::Light));
        assert_eq!(color_scheme_from_fgbg("garbage"), None);
        assert_eq!(color_scheme_from_fgbg(""), None);
    }
}
