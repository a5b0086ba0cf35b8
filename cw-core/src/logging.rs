//! Tracing setup for widget hosts.
//!
//! Console output goes to stderr so it never interleaves with what a
//! terminal host prints on stdout. The file log rotates daily and can be
//! written as JSON.

use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::AppConfig;
use crate::error::{CwError, CwResult};

/// File name prefix of the rotated log.
pub const LOG_FILE_NAME: &str = "chatwidget.log";

const FALLBACK_LEVEL: &str = "info";

/// Keeps the non-blocking file writer alive. Drop to flush.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Install the global subscriber described by `config.logging`.
///
/// `verbose` forces debug level. Fails if a global subscriber is already
/// installed.
pub fn init_logging(config: &AppConfig, verbose: bool) -> CwResult<LogGuard> {
    let log_dir = config.effective_log_dir()?;
    std::fs::create_dir_all(&log_dir)?;

    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&log_dir, LOG_FILE_NAME));

    let file_layer = if config.logging.json_output {
        fmt::layer()
            .with_writer(writer)
            .json()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let level = effective_level(&config.logging.level, verbose);
    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter(level))
        .try_init()
        .map_err(|e| CwError::Internal(format!("logging already initialized: {e}")))?;

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: guard })
}

/// Console-only logging for tests and embedders without a log directory.
///
/// Later calls are no-ops.
pub fn init_console_logging(level: &str) {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(env_filter(level))
        .try_init();
}

/// Level directive in effect; `verbose` wins over the configured one.
pub fn effective_level(configured: &str, verbose: bool) -> &str {
    if verbose {
        "debug"
    } else if configured.trim().is_empty() {
        FALLBACK_LEVEL
    } else {
        configured
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_LEVEL))
}
