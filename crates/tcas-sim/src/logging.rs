//! Log sink wiring.
//!
//! Three sinks share one subscriber: stdout, an append-only copy of the
//! console output, and a TCAS-only file fed by events with the `tcas`
//! target. Failing to open a sink is fatal; the simulation never runs
//! half-logged.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::Config;

/// Events with this target additionally land in `tcasLog.txt`.
pub const TCAS_LOG_TARGET: &str = "tcas";

/// Initialize the global subscriber. Call once, before any simulation
/// output.
pub fn init(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.log_dir).with_context(|| {
        format!("failed to create log directory {}", config.log_dir.display())
    })?;

    let console_log = Arc::new(open_append(&config.console_log_path())?);
    let tcas_log = Arc::new(open_append(&config.tcas_log_path())?);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(console_log),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(tcas_log)
                .with_filter(filter_fn(|meta| meta.target() == TCAS_LOG_TARGET)),
        )
        .init();

    Ok(())
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
