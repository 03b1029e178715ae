use crate::common::{ApplicationResult, BatchResult};
use crate::config::Config;
use crate::domains::batching::{DynExecutor, EngineStats, GenerationParams};
use crate::domains::llm_client::{EngineRegistry, LlmClient};
use futures::future::join_all;
use tracing::info;

pub struct GenerationService {
    client: LlmClient,
}

impl GenerationService {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub async fn from_config(
        config: &Config,
        registry: &EngineRegistry,
        executor: DynExecutor,
    ) -> ApplicationResult<Self> {
        config.validate()?;
        let client = LlmClient::new(registry, config.client.clone(), executor).await?;
        info!(key = %client.config_key(), "Generation service ready");
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &LlmClient {
        &self.client
    }

    pub async fn generate(&self, prompt: &str, params: GenerationParams) -> ApplicationResult<String> {
        Ok(self.client.submit(prompt, params).await?)
    }

    /// Submits every prompt concurrently so they can share batches. Results
    /// are returned in prompt order, one per prompt.
    pub async fn generate_many(
        &self,
        prompts: Vec<String>,
        params: GenerationParams,
    ) -> Vec<BatchResult<String>> {
        join_all(
            prompts
                .into_iter()
                .map(|prompt| self.client.submit(prompt, params.clone())),
        )
        .await
    }

    pub async fn stats(&self) -> EngineStats {
        self.client.engine().stats().await
    }
}
