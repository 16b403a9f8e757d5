//! The operation surface a transport layer calls: ingest and ask.
//!
//! [`RagEngine`] is an explicit handle constructed once at startup and passed
//! wherever requests are handled — there is no ambient global store, so tests
//! build isolated engines freely. Control flow:
//!
//! ```text
//! ingest: text ──► Chunker ──► records ──► EmbeddingProvider ──► VectorBackend
//! ask:    question ──► EmbeddingProvider ──► VectorBackend.search
//!             ──► context + citations ──► SufficiencyPolicy ──┬─► refuse
//!                                                             └─► AnswerGenerator
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chunking::{Chunker, build_chunk_records};
use crate::config::EngineConfig;
use crate::providers::{AnswerGenerator, EmbeddingProvider};
use crate::retrieval::{Citation, SufficiencyPolicy, build_context, citations_for};
use crate::stores::VectorBackend;
use crate::types::{Metadata, RagError};

/// Instructions handed to the generator on every answered question.
pub const SYSTEM_PROMPT: &str = "You answer strictly from the provided context. \
If the context does not contain the answer, reply exactly: \
I don't know based on the provided documents. \
Cite nothing the context does not support.";

/// Answer returned when retrieval produced too little evidence to try.
const INSUFFICIENT_CONTEXT_ANSWER: &str = "I don't know based on the provided documents.";

/// Opening phrases that mark a generated answer as a refusal.
const REFUSAL_PREFIXES: [&str; 3] = ["i don't know", "i do not know", "i don\u{2019}t know"];

const MAX_INGEST_CHARS: usize = 1_000_000;
const MAX_QUESTION_CHARS: usize = 5_000;

/// One document to ingest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Caller-supplied identifier (filename, URL, doc id). Re-ingesting the
    /// same id appends a fresh set of chunks; nothing is replaced.
    pub source_id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl IngestRequest {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Outcome of an ingestion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestReceipt {
    pub source_id: String,
    pub chunks_added: usize,
}

/// One question against the ingested corpus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    /// Overrides the configured retrieval depth for this question.
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Why an otherwise successful response declined to answer.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefusalReason {
    /// Retrieval produced too little context to attempt generation.
    InsufficientContext,
    /// The generator was invoked and itself declined.
    ModelRefused,
}

/// Response to [`RagEngine::ask`]. Refusals are successes, not errors, and
/// always keep whatever citations retrieval produced.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    /// `true` only when evidence was sufficient and generation was attempted.
    pub used_context: bool,
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal_reason: Option<RefusalReason>,
}

/// Retrieval engine: chunking, storage, retrieval, and the answer gate.
pub struct RagEngine {
    chunker: Chunker,
    policy: SufficiencyPolicy,
    top_k: usize,
    store: Arc<dyn VectorBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
}

impl std::fmt::Debug for RagEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagEngine")
            .field("chunker", &self.chunker)
            .field("policy", &self.policy)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

impl RagEngine {
    pub fn builder() -> RagEngineBuilder {
        RagEngineBuilder::default()
    }

    /// Chunks, embeds, and stores one document.
    ///
    /// The store is mutated only after every embedding was obtained, so a
    /// failing provider never leaves partial state behind. Text that
    /// normalizes to nothing is a successful no-op receipt.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReceipt, RagError> {
        if request.source_id.is_empty() {
            return Err(RagError::InvalidRequest(
                "source_id must not be empty".to_string(),
            ));
        }
        let text_chars = request.text.chars().count();
        if text_chars == 0 || text_chars > MAX_INGEST_CHARS {
            return Err(RagError::InvalidRequest(format!(
                "text must be 1..={MAX_INGEST_CHARS} characters, got {text_chars}"
            )));
        }

        let chunks = self.chunker.split(&request.text);
        let records = build_chunk_records(&request.source_id, chunks, request.metadata);
        if records.is_empty() {
            return Ok(IngestReceipt {
                source_id: request.source_id,
                chunks_added: 0,
            });
        }

        let texts: Vec<String> = records.iter().map(|record| record.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(RagError::Embedding(format!(
                "requested {} embeddings, provider returned {}",
                records.len(),
                embeddings.len()
            )));
        }

        let chunks_added = records.len();
        self.store.insert(records, embeddings).await?;
        tracing::info!(
            source_id = %request.source_id,
            chunks_added,
            "document ingested"
        );
        Ok(IngestReceipt {
            source_id: request.source_id,
            chunks_added,
        })
    }

    /// Retrieves evidence for a question and, when it suffices, answers.
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, RagError> {
        let question_chars = request.question.chars().count();
        if question_chars == 0 || question_chars > MAX_QUESTION_CHARS {
            return Err(RagError::InvalidRequest(format!(
                "question must be 1..={MAX_QUESTION_CHARS} characters, got {question_chars}"
            )));
        }
        let top_k = request.top_k.unwrap_or(self.top_k);
        if top_k == 0 {
            return Err(RagError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed_one(&request.question).await?;
        let hits = self.store.search(&query_embedding, top_k).await?;
        let context = build_context(&hits);
        let citations = citations_for(&hits);

        if !self.policy.enough_context(&context) {
            tracing::info!(
                hits = hits.len(),
                context_chars = context.chars().count(),
                "refusing: insufficient context"
            );
            return Ok(AskResponse {
                answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                used_context: false,
                citations,
                refusal_reason: Some(RefusalReason::InsufficientContext),
            });
        }

        let answer = self
            .generator
            .generate(SYSTEM_PROMPT, &request.question, &context)
            .await?;
        let answer = answer.trim().to_string();

        if is_refusal(&answer) {
            tracing::info!("refusing: generator declined despite context");
            return Ok(AskResponse {
                answer,
                used_context: true,
                citations,
                refusal_reason: Some(RefusalReason::ModelRefused),
            });
        }

        Ok(AskResponse {
            answer,
            used_context: true,
            citations,
            refusal_reason: None,
        })
    }
}

/// Case-insensitive prefix match against the known refusal phrasings.
fn is_refusal(answer: &str) -> bool {
    let lowered = answer.to_lowercase();
    REFUSAL_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(prefix))
}

/// Builder wiring the engine's collaborators together.
#[derive(Default)]
pub struct RagEngineBuilder {
    config: Option<EngineConfig>,
    store: Option<Arc<dyn VectorBackend>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    generator: Option<Arc<dyn AnswerGenerator>>,
}

impl RagEngineBuilder {
    /// Overrides the default [`EngineConfig`].
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn VectorBackend>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    #[must_use]
    pub fn generator(mut self, generator: Arc<dyn AnswerGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Validates the configuration and assembles the engine.
    pub fn build(self) -> Result<RagEngine, RagError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let store = self
            .store
            .ok_or_else(|| RagError::InvalidConfig("engine requires a store".to_string()))?;
        let embedder = self.embedder.ok_or_else(|| {
            RagError::InvalidConfig("engine requires an embedding provider".to_string())
        })?;
        let generator = self.generator.ok_or_else(|| {
            RagError::InvalidConfig("engine requires an answer generator".to_string())
        })?;
        Ok(RagEngine {
            chunker: Chunker::new(config.chunker)?,
            policy: SufficiencyPolicy::new(config.min_context_chars),
            top_k: config.top_k,
            store,
            embedder,
            generator,
        })
    }
}
