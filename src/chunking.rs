//! Passage chunking: whitespace normalization plus an overlapping
//! sliding-window splitter with a light sentence-boundary heuristic.
//!
//! Chunks are the atomic unit of retrieval; each one is embedded and ranked
//! independently, so the splitter trades exact window sizes for not cutting
//! mid-sentence where it can avoid it.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::stores::ChunkRecord;
use crate::types::{Metadata, RagError};

/// Window-relative index a sentence break must exceed before the window is
/// allowed to shrink to it. Prevents degenerate tiny chunks.
const SENTENCE_BREAK_FLOOR: usize = 200;

/// Geometry of the sliding window, in characters (not bytes).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Width of each raw window.
    pub chunk_size: usize,
    /// How far consecutive windows overlap. Must stay below `chunk_size`.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            overlap: 120,
        }
    }
}

impl ChunkerConfig {
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Rejects geometries under which the window could fail to advance.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(RagError::InvalidConfig(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Splits normalized document text into overlapping passages.
#[derive(Clone, Debug)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Builds a chunker from a validated configuration.
    pub fn new(config: ChunkerConfig) -> Result<Self, RagError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Splits `text` into chunks.
    ///
    /// The input is whitespace-normalized first (runs of whitespace collapse
    /// to a single space, ends trimmed); empty normalized input yields no
    /// chunks. Windows are `chunk_size` characters wide and consecutive
    /// windows overlap by `overlap` characters. When a window stops short of
    /// the end of the text, it shrinks to end just after the last `". "`
    /// inside it, provided that break sits deeper than
    /// [`SENTENCE_BREAK_FLOOR`] characters into the window.
    pub fn split(&self, text: &str) -> Vec<String> {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = normalized.chars().collect();
        let total = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let mut end = usize::min(start + self.config.chunk_size, total);

            if end < total
                && let Some(break_at) = last_sentence_break(&chars[start..end])
                && break_at > SENTENCE_BREAK_FLOOR
            {
                // Keep the period, drop the trailing space and remainder.
                end = start + break_at + 1;
            }

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            if end >= total {
                break;
            }

            let next = end.saturating_sub(self.config.overlap);
            // The scan must always advance.
            start = if next > start { next } else { end };
        }

        chunks
    }
}

/// Collapses every whitespace run to a single space and trims the ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let pattern = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static pattern compiles"));
    pattern.replace_all(text, " ").trim().to_string()
}

/// Window-relative index of the period in the last `". "` occurrence, if any.
fn last_sentence_break(window: &[char]) -> Option<usize> {
    window
        .windows(2)
        .rposition(|pair| pair[0] == '.' && pair[1] == ' ')
}

/// Maps chunk texts to persistable records for one source document.
///
/// Chunk ids are deterministic: `"{source_id}::chunk_{n}"` with 1-based `n`.
/// A missing metadata value becomes an empty JSON object on every record.
pub fn build_chunk_records(
    source_id: &str,
    chunks: Vec<String>,
    metadata: Option<Metadata>,
) -> Vec<ChunkRecord> {
    let metadata = metadata.unwrap_or_else(empty_metadata);
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, text)| ChunkRecord {
            chunk_id: format!("{source_id}::chunk_{}", index + 1),
            source_id: source_id.to_string(),
            text,
            metadata: metadata.clone(),
        })
        .collect()
}

pub(crate) fn empty_metadata() -> Metadata {
    serde_json::Value::Object(serde_json::Map::new())
}
