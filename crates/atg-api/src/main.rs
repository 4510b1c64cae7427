//! Azure Terraform generator API: REST server.
//!
//! Usage: `atg-api [config.toml]` (or `ATG_CONFIG`). Without a config file
//! every setting takes its default, and `ATG_*` variables override either.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use atg_api::config::ApiConfig;
use atg_api::routes;
use atg_api::state::AppState;
use atg_engine::llm::{BedrockChat, BedrockConfig, OllamaChat, OllamaChatConfig};
use atg_engine::{ArtifactSink, DirArtifactSink, LanguageModel, LlmProvider, Orchestrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "atg-api starting");

    let path = std::env::args().nth(1).or_else(|| std::env::var("ATG_CONFIG").ok());
    let config = ApiConfig::load(path.as_deref())?;

    let model = language_model(&config).await?;
    let sink = config.output_dir.as_ref().map(|dir| {
        tracing::info!(dir = %dir.display(), "writing accepted configurations");
        Arc::new(DirArtifactSink::new(dir)) as Arc<dyn ArtifactSink>
    });
    let orchestrator = Arc::new(Orchestrator::from_config(&config.engine, model, sink)?);

    // Serve even if the first build fails; /health reports degraded and
    // /api/v1/reindex can retry.
    if let Err(e) = orchestrator.reload().await {
        tracing::error!(error = %e, "initial index build failed");
    }

    let app = routes::build_router(AppState::new(orchestrator));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn language_model(config: &ApiConfig) -> anyhow::Result<Option<Arc<dyn LanguageModel>>> {
    let llm = &config.engine.llm;
    let model: Arc<dyn LanguageModel> = match llm.provider {
        LlmProvider::None => {
            tracing::info!("no language model configured, rule extraction only");
            return Ok(None);
        }
        LlmProvider::Ollama => {
            tracing::info!(host = %llm.host, model = %llm.model, "using Ollama");
            Arc::new(OllamaChat::new(OllamaChatConfig {
                host: llm.host.clone(),
                model: llm.model.clone(),
                timeout: config.engine.extraction_timeout(),
            })?)
        }
        LlmProvider::Bedrock => {
            let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let bedrock = BedrockConfig::from_env();
            tracing::info!(model_id = %bedrock.model_id, "using Bedrock");
            Arc::new(BedrockChat::new(
                aws_sdk_bedrockruntime::Client::new(&aws),
                bedrock,
            ))
        }
    };
    Ok(Some(model))
}
