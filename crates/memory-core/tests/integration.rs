//! Cross-module integration tests exercised at the public `Engine` surface
//!
//! These complement the inline unit tests in `api::tests` (which already
//! cover store/query/history, sequential undo, conflict+reject, merge
//! `merged_count`, policy confidence, and ingestion dedup) by reaching
//! across module boundaries those tests don't: wired collaborators,
//! resumable multi-batch ingestion, upsert-triple created/replaced,
//! merge-then-undo, required-field policy, and unknown-conflict errors.

use std::sync::Arc;

use memory_core::{
    Database, Engine, EntryFilter, MockEmbedder, MockVectorIndex, NewEntry, NewTriple,
    RetrievalQuery,
};

fn engine() -> Engine {
    Engine::new(Database::in_memory().expect("in-memory db"))
}

#[tokio::test]
async fn retrieval_blends_semantic_scores_from_wired_collaborators() {
    let embedder = Arc::new(MockEmbedder::new());
    let vector_index = Arc::new(MockVectorIndex::new());

    let engine = Engine::new(Database::in_memory().expect("db"))
        .with_embedder(embedder.clone())
        .with_vector_index(vector_index.clone());

    let stored = engine
        .store(NewEntry {
            topic: "ownership".into(),
            content: "Rust enforces ownership at compile time".into(),
            ..Default::default()
        })
        .await
        .expect("store");

    // The engine's `store` does not itself populate the vector index (no
    // embedding pipeline is wired to mutation paths); the caller owns
    // that, same as the teacher's `AIOrchestrator` only classifies on
    // request rather than eagerly on every write.
    let vector = embedder.embed(&stored.entry.content).await.expect("embed");
    vector_index
        .upsert(&stored.entry.id, &vector)
        .await
        .expect("index");

    let page = engine
        .retrieve(RetrievalQuery {
            query: "Rust enforces ownership at compile time".into(),
            limit: Some(10),
            cursor: None,
            weights: None,
            extra: Default::default(),
        })
        .await
        .expect("retrieve");

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].entry.id, stored.entry.id);
    assert!(page.items[0].semantic_score > 0.0);
}

#[tokio::test]
async fn ingestion_resumes_across_multiple_batches() {
    let engine = engine();

    // 25 paragraphs, each padded past half the chunk-merge threshold so
    // none of them concatenate into a shared chunk: 25 chunks, well past
    // both the sync content-length and chunk-count limits, forcing the
    // async multi-batch path instead of the sync small-input path.
    let content: String = (0..25)
        .map(|i| format!("paragraph number {i} about rust ownership and borrowing. {}", "x".repeat(280)))
        .collect::<Vec<_>>()
        .join("\n\n\n");

    let outcome = engine.ingest(&content, Some("bulk-import".into())).await.expect("ingest");
    let task_id = match outcome {
        memory_core::IngestOutcome::Async { task_id } => task_id,
        memory_core::IngestOutcome::Sync(_) => panic!("expected the async multi-batch path"),
    };

    let mut total_created = 0i64;
    loop {
        let batch = engine.ingest_batch(&task_id).await.expect("batch");
        total_created += batch.entries_created;
        if batch.remaining == 0 {
            break;
        }
    }

    assert_eq!(total_created, 25);
    let status = engine.ingestion_status(&task_id).expect("status");
    assert_eq!(status.status, memory_core::IngestionStatus::Completed);

    let entries = engine.query(EntryFilter::default()).expect("query");
    assert_eq!(entries.len(), 25);
}

#[tokio::test]
async fn upsert_triple_reports_created_then_replaced() {
    let engine = engine();

    let first = engine
        .upsert_triple(NewTriple {
            subject: "Rust".into(),
            predicate: "paradigm".into(),
            object: "systems".into(),
            source: None,
            actor: None,
            confidence: None,
        })
        .await
        .expect("first upsert");
    assert!(first.created);

    let second = engine
        .upsert_triple(NewTriple {
            subject: "Rust".into(),
            predicate: "paradigm".into(),
            object: "multi-paradigm".into(),
            source: None,
            actor: None,
            confidence: None,
        })
        .await
        .expect("second upsert");
    assert!(!second.created);
    assert_eq!(second.triple.object, "multi-paradigm");

    let graph = engine
        .query_graph(memory_core::TripleFilter {
            subject: Some("Rust".into()),
            ..Default::default()
        })
        .expect("query_graph");
    assert_eq!(graph.items.len(), 1);
}

#[tokio::test]
async fn undo_reverts_a_merge_and_restores_both_entities() {
    let engine = engine();

    let keep = engine.upsert_entity("JavaScript").await.expect("keep").entity;
    let merge = engine.upsert_entity("JS").await.expect("merge").entity;

    engine
        .relate(NewTriple {
            subject: "JS".into(),
            predicate: "has".into(),
            object: "closures".into(),
            source: None,
            actor: None,
            confidence: None,
        })
        .await
        .expect("triple");

    engine.merge_entities(&keep.id, &merge.id).await.expect("merge");

    let graph_before_undo = engine
        .query_graph(memory_core::TripleFilter {
            subject: Some("JavaScript".into()),
            ..Default::default()
        })
        .expect("query_graph");
    assert_eq!(graph_before_undo.items.len(), 1);

    engine.undo(1).expect("undo merge");

    let graph_after_undo = engine
        .query_graph(memory_core::TripleFilter {
            subject: Some("JS".into()),
            ..Default::default()
        })
        .expect("query_graph");
    assert_eq!(graph_after_undo.items.len(), 1);
}

#[tokio::test]
async fn resolving_an_unknown_conflict_id_is_not_found() {
    let engine = engine();
    let result = engine
        .resolve_conflict("not-a-real-id", memory_core::ConflictResolution::Reject)
        .await;
    assert_eq!(result.unwrap_err().kind(), "not_found");
}

#[tokio::test]
async fn policy_required_field_blocks_store_missing_source() {
    let engine = engine();
    engine.policy().require_field("store", "source");

    let missing_source = engine
        .store(NewEntry {
            topic: "x".into(),
            content: "y".into(),
            ..Default::default()
        })
        .await;
    assert_eq!(missing_source.unwrap_err().kind(), "policy");

    let with_source = engine
        .store(NewEntry {
            topic: "x".into(),
            content: "y".into(),
            source: Some("cli".into()),
            ..Default::default()
        })
        .await;
    assert!(with_source.is_ok());
}
