//! Append-only, file-persisted vector store with exact cosine search.
//!
//! Durable layout (all three rewritten together on every successful insert,
//! each via temp-file-then-rename):
//!
//! * `records.json` — pretty-printed chunk records, human-inspectable.
//! * `index.bin` — the raw embedding matrix, bincode-encoded. The prepared
//!   search structure (L2-normalized rows) is never persisted; it is rebuilt
//!   from the raw matrix when the store is opened.
//! * `manifest.json` — format version, generation counter, and the record /
//!   row / dimension counts the other two artifacts must agree with.
//!
//! Readers work against an [`Arc`] snapshot swapped in only after a rebuild
//! and persist both succeed, so a search running concurrently with an insert
//! observes either the old index or the new one, never a torn mix. Writers
//! serialize on a single gate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use super::{ChunkRecord, SearchHit, VectorBackend};
use crate::types::RagError;

const RECORDS_FILE: &str = "records.json";
const INDEX_FILE: &str = "index.bin";
const MANIFEST_FILE: &str = "manifest.json";

const FORMAT_VERSION: u32 = 1;

/// Added to every Euclidean norm before dividing, so zero vectors normalize
/// to zero instead of NaN.
const NORM_EPSILON: f32 = 1e-10;

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    generation: u64,
    records: u64,
    rows: u64,
    dim: u64,
}

/// On-disk form of the embedding matrix, row-major.
#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    dim: u32,
    rows: u32,
    data: Vec<f32>,
}

/// One immutable generation of the index.
#[derive(Debug, Default)]
struct IndexState {
    records: Vec<ChunkRecord>,
    /// Embedding width; 0 until the first insert establishes it.
    dim: usize,
    /// Raw embeddings, row-major, `records.len() * dim` values.
    matrix: Vec<f32>,
    /// L2-normalized rows, the in-memory prepared search structure.
    unit: Vec<f32>,
    generation: u64,
}

impl IndexState {
    fn rows(&self) -> usize {
        self.records.len()
    }
}

/// Durable vector store backed by flat files.
///
/// Every insert rebuilds the search structure over the entire accumulated
/// embedding set and rewrites the full durable state. Ingestion latency
/// therefore grows with corpus size; acceptable for the small corpora this
/// store targets.
#[derive(Debug)]
pub struct FlatVectorStore {
    dir: PathBuf,
    snapshot: RwLock<Arc<IndexState>>,
    write_gate: Mutex<()>,
}

impl FlatVectorStore {
    /// Opens (or initializes) a store rooted at `dir`.
    ///
    /// A directory with no artifacts starts empty. A partial or internally
    /// inconsistent artifact set fails with [`RagError::CorruptIndex`] —
    /// the store never silently drops durable state.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RagError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        let state = load_state(&dir).await?;
        tracing::debug!(
            dir = %dir.display(),
            records = state.rows(),
            generation = state.generation,
            "opened vector store"
        );
        Ok(Self {
            dir,
            snapshot: RwLock::new(Arc::new(state)),
            write_gate: Mutex::new(()),
        })
    }

    /// Directory holding the durable artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn current(&self) -> Arc<IndexState> {
        self.snapshot.read().clone()
    }
}

#[async_trait]
impl VectorBackend for FlatVectorStore {
    async fn insert(
        &self,
        records: Vec<ChunkRecord>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<(), RagError> {
        if records.len() != embeddings.len() {
            return Err(RagError::InvalidRequest(format!(
                "{} records paired with {} embeddings",
                records.len(),
                embeddings.len()
            )));
        }
        if records.is_empty() {
            return Ok(());
        }

        let _gate = self.write_gate.lock().await;
        let previous = self.current();

        let dim = if previous.dim > 0 {
            previous.dim
        } else {
            embeddings[0].len()
        };
        if dim == 0 {
            return Err(RagError::Embedding(
                "provider returned a zero-width embedding".to_string(),
            ));
        }
        for embedding in &embeddings {
            if embedding.len() != dim {
                return Err(RagError::DimensionMismatch {
                    expected: dim,
                    actual: embedding.len(),
                });
            }
        }

        let mut next = IndexState {
            records: previous.records.clone(),
            dim,
            matrix: previous.matrix.clone(),
            unit: Vec::new(),
            generation: previous.generation + 1,
        };
        next.records.extend(records);
        for embedding in &embeddings {
            next.matrix.extend_from_slice(embedding);
        }
        next.unit = normalize_rows(&next.matrix, dim);

        persist(&self.dir, &next).await?;
        tracing::info!(
            records = next.rows(),
            generation = next.generation,
            "vector store persisted"
        );

        *self.snapshot.write() = Arc::new(next);
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        if top_k == 0 {
            return Err(RagError::InvalidRequest(
                "top_k must be at least 1".to_string(),
            ));
        }

        let state = self.current();
        if state.rows() == 0 {
            return Ok(Vec::new());
        }
        if query_embedding.len() != state.dim {
            return Err(RagError::DimensionMismatch {
                expected: state.dim,
                actual: query_embedding.len(),
            });
        }

        let query = normalize_rows(query_embedding, state.dim);
        let mut ranked: Vec<(usize, f32)> = state
            .unit
            .chunks_exact(state.dim)
            .map(|row| dot(row, &query))
            .enumerate()
            .collect();
        // Stable sort: equal scores keep insertion order across re-runs.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k.min(state.rows()));

        tracing::debug!(
            candidates = state.rows(),
            returned = ranked.len(),
            "similarity search complete"
        );

        Ok(ranked
            .into_iter()
            .map(|(index, score)| SearchHit {
                record: state.records[index].clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.current().rows())
    }
}

/// L2-normalizes each `dim`-wide row of `matrix`.
fn normalize_rows(matrix: &[f32], dim: usize) -> Vec<f32> {
    let mut unit = Vec::with_capacity(matrix.len());
    for row in matrix.chunks_exact(dim) {
        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt() + NORM_EPSILON;
        unit.extend(row.iter().map(|v| v / norm));
    }
    unit
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

async fn load_state(dir: &Path) -> Result<IndexState, RagError> {
    let records_path = dir.join(RECORDS_FILE);
    let index_path = dir.join(INDEX_FILE);
    let manifest_path = dir.join(MANIFEST_FILE);

    let present = [
        records_path.exists(),
        index_path.exists(),
        manifest_path.exists(),
    ];
    if present.iter().all(|exists| !exists) {
        return Ok(IndexState::default());
    }
    if !present.iter().all(|exists| *exists) {
        return Err(RagError::CorruptIndex(format!(
            "partial artifact set in {} (records: {}, index: {}, manifest: {})",
            dir.display(),
            present[0],
            present[1],
            present[2]
        )));
    }

    let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&manifest_path).await?)
        .map_err(|err| RagError::CorruptIndex(format!("unreadable manifest: {err}")))?;
    if manifest.format_version != FORMAT_VERSION {
        return Err(RagError::CorruptIndex(format!(
            "unsupported format version {}",
            manifest.format_version
        )));
    }

    let records: Vec<ChunkRecord> = serde_json::from_str(&fs::read_to_string(&records_path).await?)
        .map_err(|err| RagError::CorruptIndex(format!("unreadable records: {err}")))?;

    let raw = fs::read(&index_path).await?;
    let (artifact, _): (IndexArtifact, usize) =
        bincode::serde::decode_from_slice(&raw, bincode::config::standard())
            .map_err(|err| RagError::CorruptIndex(format!("unreadable index: {err}")))?;

    let dim = artifact.dim as usize;
    let rows = artifact.rows as usize;
    if artifact.data.len() != dim * rows {
        return Err(RagError::CorruptIndex(format!(
            "index declares {rows} rows of width {dim} but holds {} values",
            artifact.data.len()
        )));
    }
    if records.len() != rows
        || manifest.records != records.len() as u64
        || manifest.rows != rows as u64
        || manifest.dim != dim as u64
    {
        return Err(RagError::CorruptIndex(format!(
            "artifacts disagree: {} records, {rows} embedding rows, manifest says {}/{}",
            records.len(),
            manifest.records,
            manifest.rows
        )));
    }

    Ok(IndexState {
        unit: normalize_rows(&artifact.data, dim),
        records,
        dim,
        matrix: artifact.data,
        generation: manifest.generation,
    })
}

async fn persist(dir: &Path, state: &IndexState) -> Result<(), RagError> {
    let artifact = IndexArtifact {
        dim: state.dim as u32,
        rows: state.rows() as u32,
        data: state.matrix.clone(),
    };
    let index_bytes = bincode::serde::encode_to_vec(&artifact, bincode::config::standard())
        .map_err(|err| RagError::Storage(format!("index encoding failed: {err}")))?;
    let records_json = serde_json::to_vec_pretty(&state.records)
        .map_err(|err| RagError::Storage(format!("record encoding failed: {err}")))?;
    let manifest = Manifest {
        format_version: FORMAT_VERSION,
        generation: state.generation,
        records: state.records.len() as u64,
        rows: state.rows() as u64,
        dim: state.dim as u64,
    };
    let manifest_json = serde_json::to_vec_pretty(&manifest)
        .map_err(|err| RagError::Storage(format!("manifest encoding failed: {err}")))?;

    // Manifest last: it vouches for the other two artifacts.
    write_atomic(&dir.join(INDEX_FILE), &index_bytes).await?;
    write_atomic(&dir.join(RECORDS_FILE), &records_json).await?;
    write_atomic(&dir.join(MANIFEST_FILE), &manifest_json).await?;
    Ok(())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RagError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
