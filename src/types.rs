//! Shared types and the crate-wide error enum.

use thiserror::Error;

/// Open, caller-supplied metadata attached to every chunk record.
pub type Metadata = serde_json::Value;

/// Errors surfaced by ingestion, retrieval, and persistence.
///
/// Refusals are not errors: a question the engine declines to answer still
/// produces a successful [`AskResponse`](crate::engine::AskResponse) carrying
/// a refusal reason, so callers can tell "declined correctly" from "broke".
#[derive(Debug, Error)]
pub enum RagError {
    /// The external embedding call failed or returned malformed data.
    /// The store is never mutated when this is raised during ingestion.
    #[error("embedding provider failure: {0}")]
    Embedding(String),

    /// An embedding's width disagrees with the width the store was built with.
    #[error("embedding dimension mismatch: store holds {expected}-wide vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The external answer generator failed.
    #[error("generation failure: {0}")]
    Generation(String),

    /// Durable state could not be read back as a consistent record/matrix pair.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// Durable state could not be written.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Construction-time validation failed (chunker geometry, missing engine parts).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A request violated an operation precondition (lengths, bounds).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}
