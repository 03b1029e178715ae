use super::params::GenerationParams;
use async_trait::async_trait;

/// Port for the upstream batched inference call.
///
/// Implementations must return exactly one output per prompt, in prompt
/// order. Any error is treated as a failure of the whole batch.
#[async_trait]
pub trait BatchExecutor: Send + Sync + 'static {
    async fn execute_batch(
        &self,
        prompts: Vec<String>,
        params: &GenerationParams,
    ) -> anyhow::Result<Vec<String>>;
}

pub type DynExecutor = std::sync::Arc<dyn BatchExecutor>;
