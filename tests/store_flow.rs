//! Integration tests for the flat vector store: exact search semantics,
//! durable round-trips, and corrupt-state detection.

use groundsmith::stores::{ChunkRecord, FlatVectorStore, VectorBackend};
use groundsmith::types::RagError;
use tempfile::tempdir;

fn record(n: usize) -> ChunkRecord {
    ChunkRecord {
        chunk_id: format!("doc::chunk_{n}"),
        source_id: "doc".to_string(),
        text: format!("passage number {n}"),
        metadata: serde_json::Value::Object(Default::default()),
    }
}

fn axis_records() -> (Vec<ChunkRecord>, Vec<Vec<f32>>) {
    (
        vec![record(1), record(2), record(3)],
        vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]],
    )
}

#[tokio::test]
async fn search_ranks_by_cosine_similarity() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    let (records, embeddings) = axis_records();
    store.insert(records, embeddings).await.unwrap();

    let hits = store.search(&[1.0, 0.0], 3).await.unwrap();
    assert_eq!(hits.len(), 3);

    assert_eq!(hits[0].record.chunk_id, "doc::chunk_1");
    assert!((hits[0].score - 1.0).abs() < 1e-4);

    assert_eq!(hits[1].record.chunk_id, "doc::chunk_2");
    assert!(hits[1].score.abs() < 1e-4);

    assert_eq!(hits[2].record.chunk_id, "doc::chunk_3");
    assert!((hits[2].score + 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn top_k_caps_at_store_size() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    let (records, embeddings) = axis_records();
    store.insert(records, embeddings).await.unwrap();

    let hits = store.search(&[1.0, 0.0], 50).await.unwrap();
    assert_eq!(hits.len(), 3);
}

#[tokio::test]
async fn empty_store_search_returns_nothing() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    for top_k in [1, 5, 1000] {
        let hits = store.search(&[0.3, 0.7], top_k).await.unwrap();
        assert!(hits.is_empty());
    }
}

#[tokio::test]
async fn zero_top_k_is_rejected() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    let err = store.search(&[1.0], 0).await.unwrap_err();
    assert!(matches!(err, RagError::InvalidRequest(_)));
}

#[tokio::test]
async fn mismatched_record_and_embedding_counts_are_rejected() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    let err = store
        .insert(vec![record(1)], vec![vec![1.0, 0.0], vec![0.0, 1.0]])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::InvalidRequest(_)));
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn dimension_changes_are_rejected_without_mutation() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    store
        .insert(vec![record(1)], vec![vec![1.0, 0.0]])
        .await
        .unwrap();

    let err = store
        .insert(vec![record(2)], vec![vec![1.0, 0.0, 0.0]])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));
    assert_eq!(store.count().await.unwrap(), 1);

    let err = store.search(&[1.0, 0.0, 0.0], 1).await.unwrap_err();
    assert!(matches!(err, RagError::DimensionMismatch { .. }));
}

#[tokio::test]
async fn empty_insert_is_a_noop() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    store.insert(Vec::new(), Vec::new()).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    // A no-op insert writes nothing, so a reopened store is still empty.
    drop(store);
    let reopened = FlatVectorStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 0);
}

#[tokio::test]
async fn persisted_state_round_trips_identically() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    let (records, embeddings) = axis_records();
    store.insert(records, embeddings).await.unwrap();
    let before = store.search(&[0.6, 0.8], 3).await.unwrap();
    drop(store);

    let reopened = FlatVectorStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.count().await.unwrap(), 3);
    let after = reopened.search(&[0.6, 0.8], 3).await.unwrap();

    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.record, a.record);
        assert!((b.score - a.score).abs() < 1e-6);
    }
}

#[tokio::test]
async fn appends_accumulate_across_inserts() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    store
        .insert(vec![record(1)], vec![vec![1.0, 0.0]])
        .await
        .unwrap();
    store
        .insert(vec![record(2)], vec![vec![0.0, 1.0]])
        .await
        .unwrap();

    assert_eq!(store.count().await.unwrap(), 2);
    let hits = store.search(&[0.0, 1.0], 2).await.unwrap();
    assert_eq!(hits[0].record.chunk_id, "doc::chunk_2");
}

#[tokio::test]
async fn manifest_tracks_generation_and_counts() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    store
        .insert(vec![record(1)], vec![vec![1.0, 0.0]])
        .await
        .unwrap();
    store
        .insert(vec![record(2)], vec![vec![0.0, 1.0]])
        .await
        .unwrap();
    drop(store);

    let manifest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("manifest.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(manifest["generation"], 2);
    assert_eq!(manifest["records"], 2);
    assert_eq!(manifest["dim"], 2);
}

#[tokio::test]
async fn partial_artifact_set_is_corrupt() {
    let dir = tempdir().unwrap();
    {
        let store = FlatVectorStore::open(dir.path()).await.unwrap();
        store
            .insert(vec![record(1)], vec![vec![1.0, 0.0]])
            .await
            .unwrap();
    }

    std::fs::remove_file(dir.path().join("index.bin")).unwrap();
    let err = FlatVectorStore::open(dir.path()).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex(_)));
}

#[tokio::test]
async fn records_index_disagreement_is_corrupt() {
    let dir = tempdir().unwrap();
    {
        let store = FlatVectorStore::open(dir.path()).await.unwrap();
        let (records, embeddings) = axis_records();
        store.insert(records, embeddings).await.unwrap();
    }

    // Drop one record from the JSON artifact while index and manifest still
    // describe three rows.
    let records_path = dir.path().join("records.json");
    let mut records: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&records_path).unwrap()).unwrap();
    records.pop();
    std::fs::write(&records_path, serde_json::to_string_pretty(&records).unwrap()).unwrap();

    let err = FlatVectorStore::open(dir.path()).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex(_)));
}

#[tokio::test]
async fn garbled_manifest_is_corrupt() {
    let dir = tempdir().unwrap();
    {
        let store = FlatVectorStore::open(dir.path()).await.unwrap();
        store
            .insert(vec![record(1)], vec![vec![1.0, 0.0]])
            .await
            .unwrap();
    }

    std::fs::write(dir.path().join("manifest.json"), "not json").unwrap();
    let err = FlatVectorStore::open(dir.path()).await.unwrap_err();
    assert!(matches!(err, RagError::CorruptIndex(_)));
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let dir = tempdir().unwrap();
    let store = FlatVectorStore::open(dir.path()).await.unwrap();
    // Two identical vectors: scores tie exactly, order must follow insertion.
    store
        .insert(
            vec![record(1), record(2)],
            vec![vec![0.5, 0.5], vec![0.5, 0.5]],
        )
        .await
        .unwrap();

    let hits = store.search(&[0.5, 0.5], 2).await.unwrap();
    assert_eq!(hits[0].record.chunk_id, "doc::chunk_1");
    assert_eq!(hits[1].record.chunk_id, "doc::chunk_2");
}
