use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity under which clients share one batch engine.
///
/// The credential takes part in equality and hashing but is never printed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    provider: String,
    model_name: String,
    device: u32,
    credential: String,
}

impl ConfigKey {
    pub fn new(
        provider: impl Into<String>,
        model_name: impl Into<String>,
        device: u32,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            model_name: model_name.into(),
            device,
            credential: credential.into(),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn device(&self) -> u32 {
        self.device
    }
}

impl fmt::Debug for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigKey")
            .field("provider", &self.provider)
            .field("model_name", &self.model_name)
            .field("device", &self.device)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.provider, self.model_name, self.device)
    }
}

/// Connection settings a client is built from: the dedup identity plus the
/// tuning applied if this client is the first for its key.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub provider: String,
    pub model_name: String,
    #[serde(default)]
    pub credential: String,
    #[serde(default)]
    pub device: u32,
    #[serde(default)]
    pub engine: crate::domains::batching::EngineSettings,
}

impl ClientSettings {
    pub fn new(provider: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model_name: model_name.into(),
            credential: String::new(),
            device: 0,
            engine: Default::default(),
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = credential.into();
        self
    }

    pub fn with_device(mut self, device: u32) -> Self {
        self.device = device;
        self
    }

    pub fn with_engine(mut self, engine: crate::domains::batching::EngineSettings) -> Self {
        self.engine = engine;
        self
    }

    pub fn config_key(&self) -> ConfigKey {
        ConfigKey::new(
            self.provider.clone(),
            self.model_name.clone(),
            self.device,
            self.credential.clone(),
        )
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("key", &self.config_key())
            .field("engine", &self.engine)
            .finish()
    }
}
