//! Engine configuration with environment-variable resolution.

use std::path::PathBuf;

use crate::chunking::ChunkerConfig;
use crate::types::RagError;

/// Tunables for the retrieval engine.
///
/// Defaults resolve overrides from the environment (honoring a `.env` file):
/// `RAG_TOP_K`, `RAG_MIN_CONTEXT_CHARS`, and `RAG_DATA_DIR`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// How many hits a query retrieves when the request does not say.
    pub top_k: usize,
    /// Minimum assembled-context size (characters) before an answer is attempted.
    pub min_context_chars: usize,
    /// Sliding-window geometry for ingestion.
    pub chunker: ChunkerConfig,
    /// Directory the vector store persists into.
    pub data_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        dotenvy::dotenv().ok();
        Self {
            top_k: env_usize("RAG_TOP_K").unwrap_or(5),
            min_context_chars: env_usize("RAG_MIN_CONTEXT_CHARS").unwrap_or(400),
            chunker: ChunkerConfig::default(),
            data_dir: std::env::var("RAG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_min_context_chars(mut self, min_context_chars: usize) -> Self {
        self.min_context_chars = min_context_chars;
        self
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), RagError> {
        if self.top_k == 0 {
            return Err(RagError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }
        self.chunker.validate()
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.min_context_chars, 400);
        assert_eq!(config.chunker, ChunkerConfig::default());
    }

    #[test]
    fn zero_top_k_is_rejected() {
        assert!(EngineConfig::default().with_top_k(0).validate().is_err());
    }
}
