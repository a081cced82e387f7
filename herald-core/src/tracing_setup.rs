//! Tracing setup for embedding applications
//!
//! The library itself only emits `tracing` events. Applications that have no
//! subscriber of their own can call `init_tracing` to get console output plus
//! a full trace of the last run on disk, which is where announce failures
//! are diagnosed after the fact.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the per-run trace log inside the logs directory
pub const LOG_FILE_NAME: &str = "herald-last-run.log";

/// Directory used when the caller does not pick one
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Installs the global subscriber.
///
/// Console output is filtered by `RUST_LOG` when set, otherwise by
/// `console_level`. Every event down to TRACE also goes to
/// `<logs_dir>/herald-last-run.log`, replacing the previous run's file.
/// Level names parse with `tracing::Level`'s `FromStr`, so callers can pass
/// `"debug".parse()?` straight through.
///
/// # Errors
///
/// - `Box<dyn std::error::Error>` - If the log file cannot be created or a
///   global subscriber is already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (log_file, log_file_path) = open_log_file(logs_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .compact()
        .with_filter(console_filter(console_level));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        "Logging to console at {} and to {}",
        console_level,
        log_file_path.display()
    );

    Ok(())
}

fn console_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Creates the logs directory if needed and truncates the run log.
fn open_log_file(logs_dir: Option<&Path>) -> std::io::Result<(File, PathBuf)> {
    let dir = logs_dir.unwrap_or_else(|| Path::new(DEFAULT_LOGS_DIR));
    create_dir_all(dir)?;

    let path = dir.join(LOG_FILE_NAME);
    let file = File::create(&path)?;
    Ok((file, path))
}
