use super::config_key::ConfigKey;
use crate::common::BatchResult;
use crate::domains::batching::{BatchEngine, DynExecutor, EngineSettings};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Maps each `ConfigKey` to the one engine serving it. Built once at startup
/// and passed to every client factory.
///
/// Entries are never removed; an engine that has been shut down stays
/// registered and rejects further enqueues.
#[derive(Debug, Default)]
pub struct EngineRegistry {
    engines: Mutex<HashMap<ConfigKey, Arc<BatchEngine>>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the engine for `key`, creating it with `settings` and
    /// `executor` when absent. The first caller for a key decides the
    /// engine's tuning and executor; later callers get the existing engine.
    pub async fn get_or_create(
        &self,
        key: &ConfigKey,
        settings: &EngineSettings,
        executor: DynExecutor,
    ) -> BatchResult<Arc<BatchEngine>> {
        let mut engines = self.engines.lock().await;

        if let Some(engine) = engines.get(key) {
            if engine.settings() != settings {
                warn!(
                    key = %key,
                    engine_id = %engine.id(),
                    "Engine already exists with different tuning; keeping the original settings"
                );
            }
            return Ok(engine.clone());
        }

        let engine = BatchEngine::start(settings.clone(), executor)?;
        info!(key = %key, engine_id = %engine.id(), "Registered batch engine");
        engines.insert(key.clone(), engine.clone());
        Ok(engine)
    }

    pub async fn get(&self, key: &ConfigKey) -> Option<Arc<BatchEngine>> {
        self.engines.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.engines.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.engines.lock().await.is_empty()
    }

    /// Shuts every registered engine down concurrently and waits for all of
    /// them to drain.
    pub async fn shutdown_all(&self) {
        let engines: Vec<Arc<BatchEngine>> = self.engines.lock().await.values().cloned().collect();
        info!(engines = engines.len(), "Shutting down all batch engines");
        futures::future::join_all(engines.iter().map(|engine| engine.shutdown())).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::batching::{BatchExecutor, GenerationParams};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl BatchExecutor for Echo {
        async fn execute_batch(
            &self,
            prompts: Vec<String>,
            _params: &GenerationParams,
        ) -> anyhow::Result<Vec<String>> {
            Ok(prompts)
        }
    }

    #[tokio::test]
    async fn same_key_returns_same_engine() {
        let registry = EngineRegistry::new();
        let key = ConfigKey::new("huggingface", "gpt2", 0, "");
        let settings = EngineSettings::default();

        let a = registry.get_or_create(&key, &settings, Arc::new(Echo)).await.unwrap();
        let b = registry.get_or_create(&key, &settings, Arc::new(Echo)).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len().await, 1);

        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn first_settings_win() {
        let registry = EngineRegistry::new();
        let key = ConfigKey::new("huggingface", "gpt2", 0, "");
        let first = EngineSettings::default().with_max_batch(4);
        let second = EngineSettings::default().with_max_batch(64);

        registry.get_or_create(&key, &first, Arc::new(Echo)).await.unwrap();
        let engine = registry.get_or_create(&key, &second, Arc::new(Echo)).await.unwrap();
        assert_eq!(engine.settings().max_batch, 4);

        registry.shutdown_all().await;
    }

    #[tokio::test]
    async fn invalid_settings_are_not_registered() {
        let registry = EngineRegistry::new();
        let key = ConfigKey::new("huggingface", "gpt2", 0, "");
        let bad = EngineSettings::default().with_max_queue_size(0);

        assert!(registry.get_or_create(&key, &bad, Arc::new(Echo)).await.is_err());
        assert!(registry.is_empty().await);
        assert!(registry.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn shut_down_engines_stay_registered() {
        let registry = EngineRegistry::new();
        let key = ConfigKey::new("openrouter", "mistral", 0, "k");
        let engine = registry
            .get_or_create(&key, &EngineSettings::default(), Arc::new(Echo))
            .await
            .unwrap();

        registry.shutdown_all().await;
        assert!(engine.is_closed());
        let again = registry.get(&key).await.unwrap();
        assert!(Arc::ptr_eq(&engine, &again));
    }
}
