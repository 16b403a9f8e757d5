//! Deterministic provider stand-ins for tests and demos.

use async_trait::async_trait;

use super::{AnswerGenerator, EmbeddingProvider};
use crate::types::RagError;

/// Hash-seeded embedding provider: same text, same vector, every run.
///
/// Vectors carry no semantic signal — only determinism and fixed width —
/// which is exactly what store and engine tests need.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dim: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self { dim: 16 }
    }
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider producing vectors of the given width.
    pub fn with_dim(dim: usize) -> Self {
        Self { dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut state = fnv1a(text.as_bytes());
        (0..self.dim)
            .map(|_| {
                // xorshift over the seed; values land in [-1, 1).
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state >> 11) as f32 / (1u64 << 53) as f32).mul_add(2.0, -1.0)
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x1000_0000_01b3);
    }
    hash
}

/// Generator returning one canned answer regardless of input.
#[derive(Clone, Debug)]
pub struct StaticAnswerGenerator {
    answer: String,
}

impl StaticAnswerGenerator {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

#[async_trait]
impl AnswerGenerator for StaticAnswerGenerator {
    async fn generate(
        &self,
        _system_prompt: &str,
        _question: &str,
        _context: &str,
    ) -> Result<String, RagError> {
        Ok(self.answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let provider = MockEmbeddingProvider::new();
        let inputs = vec![
            "hello world".to_string(),
            "goodbye world".to_string(),
            "hello world".to_string(),
        ];

        let first = provider.embed_batch(&inputs).await.unwrap();
        let second = provider.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn mock_embeddings_have_fixed_width() {
        let provider = MockEmbeddingProvider::with_dim(8);
        let vectors = provider
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert!(vectors.iter().all(|v| v.len() == 8));
        assert!(vectors.iter().flatten().all(|v| v.is_finite()));
    }

    #[tokio::test]
    async fn embed_one_matches_batch_entry() {
        let provider = MockEmbeddingProvider::new();
        let single = provider.embed_one("same text").await.unwrap();
        let batch = provider
            .embed_batch(&["same text".to_string()])
            .await
            .unwrap();
        assert_eq!(single, batch[0]);
    }
}
