// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! tracing setup: stderr for one-shot commands, a log file for `serve`.

use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Name of the `serve` log file inside the state directory.
pub const LOG_FILE: &str = "rvt.log";

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log warnings and above to stderr unless RUST_LOG says otherwise.
pub fn setup_stderr() {
    let _ = tracing_subscriber::registry()
        .with(filter("warn"))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Append to `<state_dir>/rvt.log` through a non-blocking writer.
///
/// The returned guard flushes pending lines when dropped.
pub fn setup_file(state_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(state_dir)?;
    let file_appender = tracing_appender::rolling::never(state_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter("info"))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()?;

    Ok(guard)
}
