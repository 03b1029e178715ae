use crate::domains::batching::{BatchExecutor, GenerationParams};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Stand-in executor that answers every prompt with an echo of itself after
/// a simulated upstream latency. Useful for demos and local wiring checks.
pub struct EchoExecutor {
    model_name: String,
    base_latency: Duration,
    jitter: Duration,
}

impl EchoExecutor {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            base_latency: Duration::from_millis(20),
            jitter: Duration::from_millis(10),
        }
    }

    pub fn with_latency(mut self, base_latency: Duration, jitter: Duration) -> Self {
        self.base_latency = base_latency;
        self.jitter = jitter;
        self
    }

    fn latency(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base_latency;
        }
        self.base_latency
            .saturating_add(rand::thread_rng().gen_range(Duration::ZERO..=self.jitter))
    }
}

#[async_trait]
impl BatchExecutor for EchoExecutor {
    async fn execute_batch(
        &self,
        prompts: Vec<String>,
        params: &GenerationParams,
    ) -> anyhow::Result<Vec<String>> {
        let delay = self.latency();
        tokio::time::sleep(delay).await;

        let max_chars = params
            .get("max_tokens")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize);
        Ok(prompts
            .into_iter()
            .map(|prompt| {
                let text = match max_chars {
                    Some(n) => prompt.chars().take(n).collect(),
                    None => prompt,
                };
                format!("[{}] {}", self.model_name, text)
            })
            .collect())
    }
}
