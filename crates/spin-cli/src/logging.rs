//! Logging configuration with rolling file appender
//!
//! Console output plus a daily log file under ~/.local/share/maison-spin/logs/

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Get the logs directory path
pub fn logs_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.data_dir().join("maison-spin").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize logging; keep the returned guard alive until exit so the file
/// writer flushes.
///
/// Defaults to INFO with DEBUG for the CLI itself. Override with RUST_LOG.
pub fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let logs_dir = logs_dir();

    if let Err(e) = std::fs::create_dir_all(&logs_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "spin-cli.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Console goes to stderr so JSON on stdout stays parseable
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,spin_core=info,spin_cli=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    guard
}
