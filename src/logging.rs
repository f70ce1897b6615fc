// ABOUTME: Log backend setup for the install helper
// ABOUTME: Appends timestamped lines to the install log file, falling back to stderr when it is unwritable

use anyhow::{Context, Result};
use log::{Level, LevelFilter};
use std::path::Path;

/// Format one human-readable log line.
pub fn format_line(timestamp: &str, level: Level, target: &str, message: &str) -> String {
    format!("{} [{:<5}] {}: {}", timestamp, level, target, message)
}

/// Levels and line format shared by every sink.
fn base_dispatch() -> fern::Dispatch {
    fern::Dispatch::new()
        .level(LevelFilter::Info)
        .level_for("nobel_installer_lib", LevelFilter::Debug)
        .format(|out, message, record| {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            out.finish(format_args!(
                "{}",
                format_line(
                    &timestamp.to_string(),
                    record.level(),
                    record.target(),
                    &message.to_string()
                )
            ))
        })
}

fn file_dispatch(log_file: &Path, echo_stderr: bool) -> Result<fern::Dispatch> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
    }

    let file = fern::log_file(log_file)
        .with_context(|| format!("opening log file {}", log_file.display()))?;

    let mut dispatch = base_dispatch().chain(file);
    if echo_stderr {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(LevelFilter::Info)
                .chain(std::io::stderr()),
        );
    }
    Ok(dispatch)
}

fn stderr_dispatch() -> fern::Dispatch {
    base_dispatch().chain(std::io::stderr())
}

/// Install the global logger. The log file is appended to, never truncated.
///
/// Nothing is installed when the file cannot be opened, so the caller can
/// still fall back to [`init_stderr_logging`].
pub fn init_logging(log_file: &Path, echo_stderr: bool) -> Result<()> {
    file_dispatch(log_file, echo_stderr)?
        .apply()
        .context("installing logger")?;

    log::info!(
        "Logging initialized, log file: {} (user {})",
        log_file.display(),
        whoami::username()
    );
    Ok(())
}

/// Install a stderr-only logger at the same levels as the file logger.
pub fn init_stderr_logging() -> Result<()> {
    stderr_dispatch().apply().context("installing stderr logger")?;
    Ok(())
}
