//! Logging bootstrap for the headless runner
//!
//! Console output goes to stderr. The optional log file is appended to, so
//! a restarted bridge keeps the history of the previous run.

use crate::settings::LogConfig;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Handle to keep the file writer thread alive
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// `RUST_LOG` if set, otherwise the configured level
fn build_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy()
}

/// Open the log file for appending, creating the directory if needed
fn open_log_file(config: &LogConfig) -> Result<File> {
    config
        .ensure_log_directory()
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let path = config.current_log_path();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {:?}", path))
}

/// Install the global subscriber. The returned guard must be held until
/// exit or buffered file output is lost.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    let filter = build_filter(config);
    let active_filter = filter.to_string();

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(build_filter(config))
    });

    let (file_layer, guard) = if config.file_output {
        let (writer, worker_guard) = tracing_appender::non_blocking(open_log_file(config)?);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter);
        (Some(layer), Some(LogGuard { _guard: worker_guard }))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Log filter: {}", active_filter);
    if config.file_output {
        tracing::info!("Appending log to {:?}", config.current_log_path());
    }

    Ok(guard)
}
