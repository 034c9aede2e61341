//! Diagnostic logging setup.
//!
//! Diagnostics go through `tracing` to stderr and, when configured, are
//! appended to a log file as well. The user-facing build log is separate, see
//! [`crate::log::LogSink`].

use crate::error::{BentoError, Result, ResultExt};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Pick the filter from the CLI flags, `RUST_LOG`, or the configured level,
/// in that order. `verbose` wins over `quiet`.
pub fn filter_for(verbose: bool, quiet: bool, level: &str) -> EnvFilter {
    if verbose {
        EnvFilter::new("bento=debug")
    } else if quiet {
        EnvFilter::new("bento=error")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("bento={}", level)))
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, level: &str, file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .compact();

    let file_layer = match file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).with_path(dir)?;
            }
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_path(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(log_file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet, level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BentoError::Config(format!("Failed to initialize logging: {}", e)))
}
