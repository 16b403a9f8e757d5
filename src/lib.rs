//! Evidence-grounded retrieval engine for citation-backed question answering.
//!
//! ```text
//! Document text ──► chunking::Chunker ──► ChunkRecords
//!                                             │
//!                    providers::EmbeddingProvider (external)
//!                                             │
//!                                             ▼
//!                            stores::FlatVectorStore (persisted)
//!                                             │
//! Question ──► embed ──► exact cosine search ─┤
//!                                             ▼
//!                 retrieval::build_context + citations
//!                                             │
//!                 retrieval::SufficiencyPolicy gate
//!                         │                   │
//!                 refuse (with citations)     ▼
//!                            providers::AnswerGenerator (external)
//! ```
//!
//! The crate owns segmentation, the durable similarity index, context
//! assembly, and the evidence-sufficiency gate. Embedding and generation are
//! consumed through traits; the bundled [`providers::OpenAiProvider`] talks
//! to any OpenAI-compatible API and [`providers::mock`] keeps tests and
//! demos deterministic.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use groundsmith::config::EngineConfig;
//! use groundsmith::engine::{AskRequest, IngestRequest, RagEngine};
//! use groundsmith::providers::{MockEmbeddingProvider, StaticAnswerGenerator};
//! use groundsmith::stores::FlatVectorStore;
//!
//! # async fn run() -> Result<(), groundsmith::types::RagError> {
//! let config = EngineConfig::default();
//! let store = Arc::new(FlatVectorStore::open(&config.data_dir).await?);
//! let engine = RagEngine::builder()
//!     .config(config)
//!     .store(store)
//!     .embedder(Arc::new(MockEmbeddingProvider::new()))
//!     .generator(Arc::new(StaticAnswerGenerator::new("…")))
//!     .build()?;
//!
//! engine.ingest(IngestRequest::new("notes", "FastAPI is a web framework.")).await?;
//! let response = engine.ask(AskRequest::new("What is FastAPI?")).await?;
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod config;
pub mod engine;
pub mod providers;
pub mod retrieval;
pub mod stores;
pub mod types;

pub use chunking::{Chunker, ChunkerConfig, build_chunk_records};
pub use config::EngineConfig;
pub use engine::{AskRequest, AskResponse, IngestReceipt, IngestRequest, RagEngine, RefusalReason};
pub use retrieval::{Citation, SufficiencyPolicy};
pub use stores::{ChunkRecord, FlatVectorStore, SearchHit, VectorBackend};
pub use types::RagError;
