//! Context assembly and the evidence-sufficiency guardrail.
//!
//! Search hits arrive already ranked; this module renders them into the one
//! context block handed to the answer generator, derives the parallel
//! citation records, and decides whether the assembled evidence is bulky
//! enough to justify attempting an answer at all.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::stores::SearchHit;

/// Longest quote a citation will carry, in characters.
const MAX_QUOTE_CHARS: usize = 260;

/// Traceability record tying an answer back to one retrieved chunk.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub chunk_id: String,
    pub source_id: String,
    pub score: f32,
    /// Chunk text, truncated to [`MAX_QUOTE_CHARS`] characters with a
    /// trailing `…` when it was cut.
    pub quote: String,
}

/// Renders ranked hits into a single context block.
///
/// Each hit becomes a header line — chunk id, source id, score to three
/// decimals — followed by the chunk text; hits are separated by a blank
/// line, in the order given. No hits yields an empty string.
pub fn build_context(hits: &[SearchHit]) -> String {
    let mut parts = Vec::with_capacity(hits.len());
    for hit in hits {
        let mut part = String::new();
        let _ = writeln!(
            part,
            "[{} | source={} | score={:.3}]",
            hit.record.chunk_id, hit.record.source_id, hit.score
        );
        let _ = writeln!(part, "{}", hit.record.text);
        parts.push(part);
    }
    parts.join("\n").trim().to_string()
}

/// Derives citations from hits, preserving rank order.
pub fn citations_for(hits: &[SearchHit]) -> Vec<Citation> {
    hits.iter()
        .map(|hit| Citation {
            chunk_id: hit.record.chunk_id.clone(),
            source_id: hit.record.source_id.clone(),
            score: hit.score,
            quote: truncate_quote(&hit.record.text),
        })
        .collect()
}

fn truncate_quote(text: &str) -> String {
    let mut chars = text.char_indices();
    match chars.nth(MAX_QUOTE_CHARS) {
        None => text.to_string(),
        Some((cut, _)) => {
            let mut quote = text[..cut].to_string();
            quote.push('…');
            quote
        }
    }
}

/// Syntactic sufficiency check: bulk, not relevance.
///
/// The policy looks only at the character length of the assembled context.
/// It cannot tell whether the evidence actually answers the question — that
/// judgment is left to the generator, which is instructed to refuse when the
/// context falls short.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SufficiencyPolicy {
    pub min_context_chars: usize,
}

impl Default for SufficiencyPolicy {
    fn default() -> Self {
        Self {
            min_context_chars: 400,
        }
    }
}

impl SufficiencyPolicy {
    pub fn new(min_context_chars: usize) -> Self {
        Self { min_context_chars }
    }

    /// `true` iff `context` holds at least the configured character count.
    pub fn enough_context(&self, context: &str) -> bool {
        context.chars().count() >= self.min_context_chars
    }
}
