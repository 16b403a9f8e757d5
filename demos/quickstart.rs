//! Minimal end-to-end run with deterministic mock providers.
//!
//! Ingests a tiny document, asks a question, and prints the full response —
//! including the refusal the sufficiency guardrail produces when the corpus
//! is this small.
//!
//! ```bash
//! cargo run --example quickstart
//! ```

use std::sync::Arc;

use groundsmith::config::EngineConfig;
use groundsmith::engine::{AskRequest, IngestRequest, RagEngine};
use groundsmith::providers::{MockEmbeddingProvider, StaticAnswerGenerator};
use groundsmith::stores::FlatVectorStore;
use groundsmith::types::RagError;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), RagError> {
    init_tracing();

    let config = EngineConfig::default();
    let store = Arc::new(FlatVectorStore::open(&config.data_dir).await?);
    let engine = RagEngine::builder()
        .config(config)
        .store(store)
        .embedder(Arc::new(MockEmbeddingProvider::new()))
        .generator(Arc::new(StaticAnswerGenerator::new(
            "FastAPI is used for building web APIs.",
        )))
        .build()?;

    let receipt = engine
        .ingest(IngestRequest::new(
            "demo",
            "FastAPI is a web framework. Streamlit is used for data apps. \
             This system tracks expenses.",
        ))
        .await?;
    println!(
        "ingested source '{}' as {} chunk(s)",
        receipt.source_id, receipt.chunks_added
    );

    let response = engine
        .ask(AskRequest::new("What is FastAPI used for?"))
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).expect("response serializes")
    );

    Ok(())
}

fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
