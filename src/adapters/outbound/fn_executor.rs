use crate::domains::batching::{BatchExecutor, DynExecutor, GenerationParams};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Adapts an async closure into a `BatchExecutor`, so callers can plug in a
/// provider call without declaring a type for it.
pub struct FnExecutor<F> {
    call: F,
}

impl<F, Fut> FnExecutor<F>
where
    F: Fn(Vec<String>, GenerationParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<String>>> + Send + 'static,
{
    pub fn new(call: F) -> Self {
        Self { call }
    }
}

#[async_trait]
impl<F, Fut> BatchExecutor for FnExecutor<F>
where
    F: Fn(Vec<String>, GenerationParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<String>>> + Send + 'static,
{
    async fn execute_batch(
        &self,
        prompts: Vec<String>,
        params: &GenerationParams,
    ) -> anyhow::Result<Vec<String>> {
        (self.call)(prompts, params.clone()).await
    }
}

/// Shorthand for `Arc::new(FnExecutor::new(call))`.
pub fn executor_fn<F, Fut>(call: F) -> DynExecutor
where
    F: Fn(Vec<String>, GenerationParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<String>>> + Send + 'static,
{
    Arc::new(FnExecutor::new(call))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_receives_prompts_and_params() {
        let executor = executor_fn(|prompts: Vec<String>, params: GenerationParams| async move {
            let suffix = params
                .get("suffix")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Ok::<_, anyhow::Error>(prompts.into_iter().map(|p| p + &suffix).collect::<Vec<_>>())
        });

        let params = GenerationParams::new().with("suffix", "!");
        let out = executor
            .execute_batch(vec!["hi".into()], &params)
            .await
            .unwrap();
        assert_eq!(out, vec!["hi!"]);
    }

    #[tokio::test]
    async fn closure_errors_propagate() {
        let executor = executor_fn(|_: Vec<String>, _: GenerationParams| async {
            Err::<Vec<String>, _>(anyhow::anyhow!("rate limited"))
        });
        let err = executor
            .execute_batch(vec!["x".into()], &GenerationParams::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "rate limited");
    }
}
