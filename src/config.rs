use crate::common::{ApplicationError, ApplicationResult, BatchError};
use crate::domains::llm_client::ClientSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "LLM_BATCHER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub client: ClientSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `llm_batcher=debug`.
    pub filter: String,
    /// Also write log lines to this file when set.
    pub file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> ApplicationResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Layers, lowest precedence first: built-in defaults, the optional TOML
    /// file, then `LLM_BATCHER__*` environment variables
    /// (e.g. `LLM_BATCHER__CLIENT__ENGINE__MAX_BATCH=32`).
    pub fn load(path: Option<&Path>) -> ApplicationResult<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ApplicationResult<()> {
        if self.client.provider.trim().is_empty() {
            return Err(BatchError::invalid_config("client.provider must not be empty").into());
        }
        if self.client.model_name.trim().is_empty() {
            return Err(BatchError::invalid_config("client.model_name must not be empty").into());
        }
        self.client.engine.validate().map_err(ApplicationError::from)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientSettings::new("echo", "echo-1"),
            logging: LoggingConfig::default(),
        }
    }
}
