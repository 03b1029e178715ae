use std::sync::Arc;
use thiserror::Error;

/// Failure delivered to a caller through its result handle.
///
/// Cloneable so one executor failure can be handed to every request of the
/// batch it belonged to.
#[derive(Error, Debug, Clone)]
pub enum BatchError {
    #[error("Batch engine is shut down")]
    EngineClosed,

    #[error("Executor failure: {0}")]
    ExecutorFailure(Arc<anyhow::Error>),

    #[error("Request was cancelled before it was resolved")]
    Cancelled,

    #[error("Request parameters differ from the parameters of the queued batch")]
    HeterogeneousParameters,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl BatchError {
    pub fn executor(err: anyhow::Error) -> Self {
        BatchError::ExecutorFailure(Arc::new(err))
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        BatchError::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn is_executor_failure(&self) -> bool {
        matches!(self, BatchError::ExecutorFailure(_))
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Failed to parse configuration file: {0}")]
    ConfigurationFormat(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type BatchResult<T> = Result<T, BatchError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
