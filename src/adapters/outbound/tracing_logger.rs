use crate::common::{ApplicationError, ApplicationResult};
use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber: console output, plus a plain-text
/// file when `config.file` is set. `RUST_LOG` overrides `config.filter`.
pub fn init_tracing(config: &LoggingConfig) -> ApplicationResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| ApplicationError::Logging(format!("invalid log filter: {}", e)))?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(config.ansi))
        .with(file_layer)
        .try_init()
        .map_err(|e| ApplicationError::Logging(e.to_string()))
}
