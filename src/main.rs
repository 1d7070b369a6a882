use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rag_query::api;
use rag_query::config::Config;
use rag_query::indexer::DocumentIndexer;
use rag_query::llm::embeddings::HttpEmbedder;
use rag_query::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!(
        "LLM provider: {} ({})",
        config.llm.provider,
        config.llm.base_url
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("index") => {
            let rebuild = args.iter().any(|a| a == "--rebuild");
            run_indexer(config, rebuild).await
        }
        _ => serve(config).await,
    }
}

/// Offline path: build the fragment store from the documents directory.
async fn run_indexer(config: Config, rebuild: bool) -> anyhow::Result<()> {
    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .timeout(std::time::Duration::from_secs(120))
        .build()?;

    let embedder = Arc::new(HttpEmbedder::new(client, config.llm.clone()));
    let indexer = DocumentIndexer::new(embedder, config);

    let count = indexer.build_index(rebuild).await?;
    tracing::info!("indexing complete: {count} fragments");
    Ok(())
}

/// Online path: serve the query API.
async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(config.clone())?;

    let app = Router::new()
        .route("/", get(api::query::root))
        .route("/health", get(api::query::health))
        .route("/query", post(api::query::query))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
