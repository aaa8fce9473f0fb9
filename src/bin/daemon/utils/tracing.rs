//! Tracing Utilities Module
//!
//! This module contains tracing functionality for the monitoggle daemon,
//! including logging configuration with file output.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the file writer flushing for the lifetime of the process
static WORKER_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initializes the tracing subscriber with file and console output.
/// When `log_path` cannot be opened only the console is used.
pub fn setup_tracing(log_path: &Path) {
    WORKER_GUARD.get_or_init(|| {
        let file = OpenOptions::new().append(true).create(true).open(log_path);
        let (file_layer, guard, open_error) = match file {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let file_layer = fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(env_filter());
                (Some(file_layer), Some(guard), None)
            }
            Err(e) => (None, None, Some(e)),
        };

        let stdout_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_filter(env_filter());

        // A missing file layer is a no-op, so both cases share one subscriber type
        let _ = tracing_subscriber::registry()
            .with(file_layer)
            .with(stdout_layer)
            .try_init();

        if let Some(e) = open_error {
            tracing::warn!("Cannot open log file {}: {}, logging to console only", log_path.display(), e);
        }
        guard
    });
}
