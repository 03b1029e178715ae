use super::config_key::{ClientSettings, ConfigKey};
use super::registry::EngineRegistry;
use crate::common::{BatchError, BatchResult};
use crate::domains::batching::{BatchEngine, DynExecutor, GenerationParams};
use std::sync::Arc;
use tracing::debug;

/// Client handle for one provider/model/device/credential combination.
///
/// Clients built with the same `ConfigKey` against the same registry share a
/// single engine, so their requests can end up in the same batch.
#[derive(Debug, Clone)]
pub struct LlmClient {
    key: ConfigKey,
    engine: Arc<BatchEngine>,
}

impl LlmClient {
    pub async fn new(
        registry: &EngineRegistry,
        settings: ClientSettings,
        executor: DynExecutor,
    ) -> BatchResult<Self> {
        let key = settings.config_key();
        let engine = registry
            .get_or_create(&key, &settings.engine, executor)
            .await?;
        debug!(key = %key, engine_id = %engine.id(), "LLM client attached to engine");
        Ok(Self { key, engine })
    }

    pub fn config_key(&self) -> &ConfigKey {
        &self.key
    }

    pub fn engine(&self) -> &Arc<BatchEngine> {
        &self.engine
    }

    /// Generates one completion through the shared engine.
    ///
    /// Waits first for queue space, then for the batch holding this prompt
    /// to be flushed. No timeout is applied here.
    pub async fn submit(
        &self,
        prompt: impl Into<String>,
        params: GenerationParams,
    ) -> BatchResult<String> {
        let handle = self.engine.enqueue(prompt, params).await?;
        handle.await
    }

    /// Calls the engine's executor directly with a caller-assembled batch,
    /// bypassing the queue.
    pub async fn generate_batch(
        &self,
        prompts: Vec<String>,
        params: &GenerationParams,
    ) -> BatchResult<Vec<String>> {
        if self.engine.is_closed() {
            return Err(BatchError::EngineClosed);
        }
        let expected = prompts.len();
        let outputs = self
            .engine
            .executor()
            .execute_batch(prompts, params)
            .await
            .map_err(BatchError::executor)?;
        if outputs.len() != expected {
            return Err(BatchError::executor(anyhow::anyhow!(
                "executor returned {} results for {} prompts",
                outputs.len(),
                expected
            )));
        }
        Ok(outputs)
    }

    /// Shuts down every engine in `registry`, waiting for each to drain.
    pub async fn shutdown_all(registry: &EngineRegistry) {
        registry.shutdown_all().await;
    }
}
