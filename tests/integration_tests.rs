use llm_batcher::adapters::outbound::EchoExecutor;
use llm_batcher::application::GenerationService;
use llm_batcher::domains::batching::{GenerationParams, ParameterPolicy};
use llm_batcher::domains::llm_client::EngineRegistry;
use llm_batcher::{ApplicationError, BatchError, Config};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// The only test in this binary that touches LLM_BATCHER__* variables.
#[test]
fn test_load_layers_defaults_file_and_environment() {
    let file = write_config(
        r#"
[client]
provider = "openrouter"
model_name = "mistral-7b"

[client.engine]
max_batch = 8
parameter_policy = "split_by_parameters"
"#,
    );

    std::env::set_var("LLM_BATCHER__CLIENT__ENGINE__MAX_QUEUE_SIZE", "64");
    let config = Config::load(Some(file.path()));
    std::env::remove_var("LLM_BATCHER__CLIENT__ENGINE__MAX_QUEUE_SIZE");
    let config = config.unwrap();

    assert_eq!(config.client.provider, "openrouter");
    assert_eq!(config.client.model_name, "mistral-7b");
    assert_eq!(config.client.engine.max_batch, 8);
    assert_eq!(config.client.engine.max_queue_size, 64);
    assert_eq!(config.client.engine.flush_interval_ms, 50);
    assert_eq!(
        config.client.engine.parameter_policy,
        ParameterPolicy::SplitByParameters
    );
    assert_eq!(config.logging.filter, "info");
}

#[tokio::test]
async fn test_from_file_rejects_malformed_toml() {
    let file = write_config("[client\nprovider = ");
    let err = Config::from_file(file.path()).await.unwrap_err();
    assert!(matches!(err, ApplicationError::ConfigurationFormat(_)));
}

#[tokio::test]
async fn test_service_built_from_config_file_drains_on_shutdown() {
    let file = write_config(
        r#"
[client]
provider = "echo"
model_name = "echo-2"

[client.engine]
max_batch = 100
flush_interval_ms = 3600000
"#,
    );
    let config = Config::from_file(file.path()).await.unwrap();

    let registry = EngineRegistry::new();
    let executor = Arc::new(EchoExecutor::new("echo-2").with_latency(Duration::ZERO, Duration::ZERO));
    let service = GenerationService::from_config(&config, &registry, executor)
        .await
        .unwrap();

    let engine = service.client().engine().clone();
    let mut handles = Vec::new();
    for i in 0..5 {
        handles.push(
            engine
                .enqueue(format!("agent-{}", i), GenerationParams::new())
                .await
                .unwrap(),
        );
    }

    registry.shutdown_all().await;

    for (i, mut handle) in handles.into_iter().enumerate() {
        let result = handle.try_result().expect("resolved during shutdown");
        assert_eq!(result.unwrap(), format!("[echo-2] agent-{}", i));
    }

    let err = service
        .generate("after shutdown", GenerationParams::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ApplicationError::Batch(BatchError::EngineClosed)));
}
