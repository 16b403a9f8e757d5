//! Storage backends for chunk records and their embeddings.
//!
//! A single [`VectorBackend`] trait abstracts the storage seam so callers
//! never bind to a concrete store. The crate ships one implementation,
//! [`flat::FlatVectorStore`]: an append-only, file-persisted collection with
//! exact brute-force cosine search — deliberate simplicity for small corpora,
//! not an approximate-nearest-neighbor engine.
//!
//! ```text
//!                 ┌──────────────────────┐
//!                 │  VectorBackend trait │
//!                 │ (insert/search/count)│
//!                 └──────────┬───────────┘
//!                            │
//!                            ▼
//!                 ┌──────────────────────┐
//!                 │   FlatVectorStore    │
//!                 │ records.json         │
//!                 │ index.bin + manifest │
//!                 └──────────────────────┘
//! ```

pub mod flat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Metadata, RagError};

pub use flat::FlatVectorStore;

/// A retrievable passage of a source document.
///
/// `chunk_id` is derived deterministically from the source id and the chunk's
/// 1-based position within that source. Records are append-only: once stored
/// they are never edited or deleted by this crate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub source_id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A chunk paired with its cosine similarity to a query, in `[-1, 1]`.
///
/// Hits are ephemeral: built fresh per search, never persisted.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub record: ChunkRecord,
    pub score: f32,
}

/// Unified interface over chunk/embedding storage.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Appends records with their embeddings and persists the result.
    ///
    /// `records` and `embeddings` must be parallel; an empty pair is a no-op.
    /// Every embedding must match the store's established width, otherwise
    /// the call fails with [`RagError::DimensionMismatch`] and nothing is
    /// stored.
    async fn insert(
        &self,
        records: Vec<ChunkRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<(), RagError>;

    /// Exact similarity search, most similar first.
    ///
    /// Returns `min(top_k, store size)` hits; an empty store yields an empty
    /// result rather than an error. `top_k` must be at least 1. Equal scores
    /// keep insertion order.
    async fn search(&self, query_embedding: &[f32], top_k: usize)
    -> Result<Vec<SearchHit>, RagError>;

    /// Number of stored chunk records.
    async fn count(&self) -> Result<usize, RagError>;
}
