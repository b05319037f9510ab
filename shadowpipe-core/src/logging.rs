//! `tracing`-based logging setup for the proxy.

use anyhow::{Context, Result};
use tracing_subscriber::{prelude::*, registry};

use crate::config::LogLevel;

/// Install a `tracing` stdout layer at the given verbosity. Idempotent per
/// process: a second call after one has already succeeded returns an error,
/// same as `tracing_subscriber::registry().try_init()`.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let stdout = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_filter(level.as_filter());

    registry()
        .with(stdout)
        .try_init()
        .context("initialize tracing subscriber")?;

    tracing::info!("set log level to {level:?}");
    Ok(())
}
