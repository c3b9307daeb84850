//! Global log and trace subscriber setup.

use thiserror::Error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("log bridge already installed: {0}")]
    LogBridge(#[from] log::SetLoggerError),

    #[error("global subscriber already installed: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs a fmt subscriber and routes `log` records into it.
///
/// `RUST_LOG` wins over `filter`. Fails (without panicking) when a logger
/// or subscriber is already installed.
pub fn init_logging(filter: Option<&str>) -> Result<(), TelemetryError> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or(DEFAULT_FILTER)));

    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
