//! External collaborator seams: embeddings and answer generation.
//!
//! The retrieval core never runs model inference itself. It consumes two
//! capabilities through these traits — an embedding provider that maps text
//! to fixed-width vectors, and an answer generator that maps (instructions,
//! question, context) to prose. [`openai::OpenAiProvider`] implements both
//! against any OpenAI-compatible API; [`mock`] ships deterministic stand-ins
//! for tests and demos. Timeout and retry policy belong to the caller or the
//! provider's own client, never to this crate.

pub mod mock;
pub mod openai;

use async_trait::async_trait;

use crate::types::RagError;

pub use mock::{MockEmbeddingProvider, StaticAnswerGenerator};
pub use openai::{OpenAiConfig, OpenAiProvider};

/// Maps text to fixed-width embedding vectors.
///
/// Implementations must return dimensionally consistent vectors across calls
/// against the same store; the store rejects width changes with
/// [`RagError::DimensionMismatch`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let input = [text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        vectors.pop().ok_or_else(|| {
            RagError::Embedding("provider returned no embedding for a single input".to_string())
        })
    }
}

/// Produces a natural-language answer grounded in the supplied context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        question: &str,
        context: &str,
    ) -> Result<String, RagError>;
}
