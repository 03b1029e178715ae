use llm_batcher::adapters::outbound::{init_tracing, EchoExecutor};
use llm_batcher::application::GenerationService;
use llm_batcher::domains::batching::GenerationParams;
use llm_batcher::domains::llm_client::EngineRegistry;
use llm_batcher::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const DEMO_PROMPTS: usize = 40;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = Config::load(Some(config_path.as_path()))?;

    init_tracing(&config.logging)?;
    info!("Starting llm-batcher demo");
    info!(
        provider = %config.client.provider,
        model = %config.client.model_name,
        max_batch = config.client.engine.max_batch,
        "Configuration loaded"
    );

    let registry = EngineRegistry::new();
    let executor = Arc::new(EchoExecutor::new(config.client.model_name.clone()));
    let service = GenerationService::from_config(&config, &registry, executor).await?;

    let prompts: Vec<String> = (0..DEMO_PROMPTS)
        .map(|i| format!("agent {} decides its next move", i))
        .collect();
    let params = GenerationParams::new().with("temperature", 0.7);

    tokio::select! {
        results = service.generate_many(prompts, params) => {
            for (i, result) in results.iter().enumerate() {
                match result {
                    Ok(text) => info!(prompt = i, "{}", text),
                    Err(e) => error!(prompt = i, "Generation failed: {}", e),
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted; draining outstanding requests");
        }
    }

    registry.shutdown_all().await;
    let stats = service.stats().await;
    info!(
        batches = stats.batches_flushed,
        completed = stats.requests_completed,
        failed = stats.requests_failed,
        "Shut down llm-batcher"
    );

    Ok(())
}
