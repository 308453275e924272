//! The structured operation envelope
//!
//! `Engine` is the single entry point the wire protocol layer (out of
//! scope here) is meant to sit in front of: one method per operation in
//! the external-interface table, each taking plain params and returning a
//! plain result or a typed `Error`. Every mutation checks policy first,
//! commits through the storage layer, and notifies the change-notification
//! collaborator with the affected resource URIs, mirroring the teacher's
//! `AIOrchestrator`-in-front-of-`Database` layering.

use std::sync::{Arc, Mutex};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collaborators::{ChangeNotifier, Embedder, NoopChangeNotifier, VectorIndex};
use crate::conflict;
use crate::conflict_cache::ConflictCache;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::ingest;
use crate::models::{
    CanonicalEntity, ConflictInfo, ConflictResolution, Entry, EntryFilter, EntryUpdate,
    IngestionTask, NewEntry, NewTriple, RetrievalQuery, Transaction, Triple, TripleFilter,
    TripleUpdate, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT,
};
use crate::policy::PolicyEngine;
use crate::retriever::Retriever;

/// The kind of row an operation's `delete` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeletableKind {
    Entry,
    Triple,
}

/// Process-wide engine wiring the storage layer, policy engine, conflict
/// cache, and pluggable collaborators behind one operation surface.
pub struct Engine {
    db: Database,
    policy: Mutex<PolicyEngine>,
    conflicts: Mutex<ConflictCache>,
    embedder: Option<Arc<dyn Embedder>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl Engine {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            policy: Mutex::new(PolicyEngine::new()),
            conflicts: Mutex::new(ConflictCache::new()),
            embedder: None,
            vector_index: None,
            notifier: Arc::new(NoopChangeNotifier),
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_vector_index(mut self, vector_index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(vector_index);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Access the policy engine for initialization-time configuration
    /// (required fields, minimum confidence floor). Not intended for
    /// runtime mutation once requests are flowing.
    pub fn policy(&self) -> std::sync::MutexGuard<'_, PolicyEngine> {
        self.policy.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_policy(&self, op: &str, params: &Value) -> Result<()> {
        self.policy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .check_policy(op, params)
    }

    async fn notify(&self, resource_uris: Vec<String>) {
        if !resource_uris.is_empty() {
            self.notifier.notify(&resource_uris).await;
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // -- store / update / query / delete (entries) --------------------

    pub async fn store(&self, new: NewEntry) -> Result<StoreResult> {
        self.check_policy("store", &serde_json::to_value(&new)?)?;
        let entry = self.db.create_entry(new)?;
        let uri = format!("entries/{}", entry.id);
        self.notify(vec![uri.clone()]).await;
        Ok(StoreResult { entry, uri })
    }

    pub async fn update(&self, id: &str, update: EntryUpdate) -> Result<Entry> {
        self.check_policy("update", &serde_json::to_value(&update)?)?;
        let entry = self.db.update_entry(id, update)?;
        self.notify(vec![format!("entries/{}", entry.id)]).await;
        Ok(entry)
    }

    pub fn query(&self, filter: EntryFilter) -> Result<Vec<Entry>> {
        self.db.query_entries(filter)
    }

    pub async fn delete(&self, id: &str, entity_type: DeletableKind) -> Result<DeleteResult> {
        match entity_type {
            DeletableKind::Entry => self.db.delete_entry(id)?,
            DeletableKind::Triple => self.db.delete_triple(id)?,
        }
        let uri = match entity_type {
            DeletableKind::Entry => format!("entries/{id}"),
            DeletableKind::Triple => format!("triples/{id}"),
        };
        self.notify(vec![uri]).await;
        Ok(DeleteResult {
            id: id.to_string(),
            entity_type,
            deleted: true,
        })
    }

    // -- relate / update_triple / upsert_triple / query_graph ----------

    /// Create a triple unless it contradicts an existing one at the same
    /// (subject, predicate), in which case a `ConflictInfo` is returned
    /// and cached for a subsequent `resolve_conflict` call.
    pub async fn relate(&self, new: NewTriple) -> Result<RelateOutcome> {
        self.check_policy("relate", &serde_json::to_value(&new)?)?;

        if let Some(info) = conflict::detect_conflict(&self.db, &new)? {
            self.conflicts
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .save(info.clone());
            return Ok(RelateOutcome::Conflict(info));
        }

        let triple = self.db.create_triple(new)?;
        self.notify(vec![format!("triples/{}", triple.id)]).await;
        Ok(RelateOutcome::Created(triple))
    }

    pub async fn update_triple(&self, id: &str, update: TripleUpdate) -> Result<Triple> {
        self.check_policy("update_triple", &serde_json::to_value(&update)?)?;
        let triple = self.db.update_triple(id, update)?;
        self.notify(vec![format!("triples/{}", triple.id)]).await;
        Ok(triple)
    }

    pub async fn upsert_triple(&self, new: NewTriple) -> Result<UpsertTripleResult> {
        self.check_policy("upsert_triple", &serde_json::to_value(&new)?)?;
        let existed = !self
            .db
            .triples_with_subject_predicate(&new.subject, &new.predicate)?
            .is_empty();
        let triple = self.db.upsert_triple(new)?;
        self.notify(vec![format!("triples/{}", triple.id)]).await;
        Ok(UpsertTripleResult {
            created: !existed,
            triple,
        })
    }

    pub fn query_graph(&self, filter: TripleFilter) -> Result<QueryGraphPage> {
        let items = self.db.query_triples(filter)?;
        Ok(QueryGraphPage {
            items,
            next_cursor: None,
        })
    }

    // -- conflict resolution --------------------------------------------

    pub async fn resolve_conflict(
        &self,
        conflict_id: &str,
        resolution: ConflictResolution,
    ) -> Result<ResolveConflictOutcome> {
        let info = self
            .conflicts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(conflict_id)
            .ok_or_else(|| Error::NotFound(format!("conflict {conflict_id} not found")))?;

        match resolution {
            ConflictResolution::Reject => Ok(ResolveConflictOutcome::Rejected),
            ConflictResolution::Replace => {
                let update = TripleUpdate {
                    predicate: None,
                    object: Some(info.candidate.object.clone()),
                    source: Some(info.candidate.source.clone()),
                    actor: Some(info.candidate.actor.clone()),
                    confidence: Some(info.candidate.confidence),
                };
                let triple = self.db.update_triple(&info.existing.id, update)?;
                self.notify(vec![format!("triples/{}", triple.id)]).await;
                Ok(ResolveConflictOutcome::Triple(triple))
            }
            ConflictResolution::RetainBoth => {
                let triple = self.db.create_triple(info.candidate.clone())?;
                self.notify(vec![format!("triples/{}", triple.id)]).await;
                Ok(ResolveConflictOutcome::Triple(triple))
            }
        }
    }

    // -- entity resolution and merge -------------------------------------

    pub async fn upsert_entity(&self, name: &str) -> Result<UpsertEntityResult> {
        if let Some(entity) = self.db.resolve_exact(name)? {
            return Ok(UpsertEntityResult {
                entity,
                created: false,
            });
        }
        let entity = self.db.create_entity(name)?;
        self.notify(vec![format!("entities/{}", entity.id)]).await;
        Ok(UpsertEntityResult {
            entity,
            created: true,
        })
    }

    pub async fn merge_entities(&self, keep_id: &str, merge_id: &str) -> Result<MergeResult> {
        let outcome = self.db.merge_entities(keep_id, merge_id)?;
        self.notify(vec![format!("entities/{}", keep_id)]).await;
        Ok(MergeResult {
            keep_id: keep_id.to_string(),
            merge_id: merge_id.to_string(),
            merged_count: outcome.merged_count,
        })
    }

    // -- undo / history ----------------------------------------------------

    pub fn undo(&self, count: i64) -> Result<crate::db::UndoResult> {
        self.db.undo(count.max(1))
    }

    /// Cursor-paginated transaction history, newest first, in the same
    /// opaque-cursor shape as `query`/the read-resources.
    pub fn history(
        &self,
        limit: Option<i64>,
        entity_type: Option<crate::models::EntityKind>,
        cursor: Option<&str>,
    ) -> Result<ReadPage<Transaction>> {
        let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT);
        let after = cursor.and_then(crate::retriever::decode_cursor);
        let items = self.db.history(limit + 1, entity_type, after.as_deref())?;
        Ok(paginate(items, limit))
    }

    // -- retrieval ----------------------------------------------------------

    pub async fn retrieve(&self, query: RetrievalQuery) -> Result<crate::models::RetrievalPage> {
        let retriever = Retriever::new(
            &self.db,
            self.embedder.as_deref(),
            self.vector_index.as_deref(),
        );
        retriever.retrieve(query).await
    }

    // -- ingestion ----------------------------------------------------------

    pub async fn ingest(&self, content: &str, source: Option<String>) -> Result<IngestOutcome> {
        let result = ingest::ingest(&self.db, content, source, self.notifier.as_ref()).await?;
        let task = self.db.get_ingestion_task(&result.task_id)?;
        if task.status == crate::models::IngestionStatus::Pending {
            Ok(IngestOutcome::Async {
                task_id: result.task_id,
            })
        } else {
            Ok(IngestOutcome::Sync(result))
        }
    }

    /// Process one more batch of a pending/processing ingestion task.
    pub async fn ingest_batch(&self, task_id: &str) -> Result<ingest::IngestionBatch> {
        ingest::process_batch(&self.db, task_id, self.notifier.as_ref()).await
    }

    pub fn ingestion_status(&self, task_id: &str) -> Result<IngestionTask> {
        self.db.get_ingestion_task(task_id)
    }

    // -- read resources -------------------------------------------------

    pub fn read_entries(&self, limit: Option<i64>, cursor: Option<&str>) -> Result<ReadPage<Entry>> {
        let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT);
        let after = cursor.and_then(crate::retriever::decode_cursor);
        let items = self.db.list_entries(limit + 1, after.as_deref())?;
        Ok(paginate(items, limit))
    }

    pub fn read_triples(&self, limit: Option<i64>, cursor: Option<&str>) -> Result<ReadPage<Triple>> {
        let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT);
        let after = cursor.and_then(crate::retriever::decode_cursor);
        let items = self.db.list_triples(limit + 1, after.as_deref())?;
        Ok(paginate(items, limit))
    }

    pub fn read_transactions(
        &self,
        limit: Option<i64>,
        cursor: Option<&str>,
    ) -> Result<ReadPage<Transaction>> {
        let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT).clamp(1, MAX_QUERY_LIMIT);
        let after = cursor.and_then(crate::retriever::decode_cursor);
        let items = self.db.list_transactions(limit + 1, after.as_deref())?;
        Ok(paginate(items, limit))
    }
}

/// Identify an id field on a read-resource row so `paginate` can encode
/// the next cursor without per-type glue.
trait HasId {
    fn id(&self) -> &str;
}

impl HasId for Entry {
    fn id(&self) -> &str {
        &self.id
    }
}
impl HasId for Triple {
    fn id(&self) -> &str {
        &self.id
    }
}
impl HasId for Transaction {
    fn id(&self) -> &str {
        &self.id
    }
}

fn paginate<T: HasId>(mut items: Vec<T>, limit: i64) -> ReadPage<T> {
    let has_more = items.len() as i64 > limit;
    if has_more {
        items.truncate(limit as usize);
    }
    let next_cursor = if has_more {
        items.last().map(|item| crate::retriever::encode_cursor(item.id()))
    } else {
        None
    };
    let count = items.len();
    ReadPage {
        items,
        count,
        next_cursor,
    }
}

// -- result envelopes -----------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StoreResult {
    pub entry: Entry,
    pub uri: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub id: String,
    pub entity_type: DeletableKind,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RelateOutcome {
    Created(Triple),
    Conflict(ConflictInfo),
}

#[derive(Debug, Clone, Serialize)]
pub struct UpsertTripleResult {
    pub triple: Triple,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryGraphPage {
    pub items: Vec<Triple>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolveConflictOutcome {
    Triple(Triple),
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpsertEntityResult {
    pub entity: CanonicalEntity,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeResult {
    pub keep_id: String,
    pub merge_id: String,
    pub merged_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IngestOutcome {
    Sync(ingest::SyncIngestResult),
    Async { task_id: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadPage<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTriple;

    fn engine() -> Engine {
        Engine::new(Database::in_memory().expect("db"))
    }

    #[tokio::test]
    async fn store_then_query_by_topic_returns_the_entry() {
        let engine = engine();
        engine
            .store(NewEntry {
                topic: "ts-quirk".into(),
                content: "Zod v4 changes".into(),
                tags: ["typescript".to_string()].into_iter().collect(),
                ..Default::default()
            })
            .await
            .expect("store");

        let results = engine
            .query(EntryFilter {
                topic: Some("ts".into()),
                ..Default::default()
            })
            .expect("query");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].topic, "ts-quirk");

        let history = engine.history(None, None, None).expect("history");
        assert_eq!(history.items.len(), 1);
        assert_eq!(history.items[0].op, crate::models::TransactionOp::Create);
    }

    #[tokio::test]
    async fn sequential_undo_reverts_each_store_independently() {
        let engine = engine();
        engine
            .store(NewEntry {
                topic: "a".into(),
                content: "first".into(),
                ..Default::default()
            })
            .await
            .expect("store a");
        engine
            .store(NewEntry {
                topic: "b".into(),
                content: "second".into(),
                ..Default::default()
            })
            .await
            .expect("store b");

        engine.undo(1).expect("undo b");
        let remaining = engine.query(EntryFilter::default()).expect("query");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].topic, "a");

        engine.undo(1).expect("undo a");
        let remaining = engine.query(EntryFilter::default()).expect("query");
        assert_eq!(remaining.len(), 0);
    }

    #[tokio::test]
    async fn relate_surfaces_a_conflict_and_reject_leaves_store_unchanged() {
        let engine = engine();
        engine
            .relate(NewTriple {
                subject: "Rust".into(),
                predicate: "creator".into(),
                object: "Graydon Hoare".into(),
                source: None,
                actor: None,
                confidence: None,
            })
            .await
            .expect("seed triple");

        let outcome = engine
            .relate(NewTriple {
                subject: "Rust".into(),
                predicate: "creator".into(),
                object: "Someone Else".into(),
                source: None,
                actor: None,
                confidence: Some(0.5),
            })
            .await
            .expect("relate");

        let conflict = match outcome {
            RelateOutcome::Conflict(c) => c,
            RelateOutcome::Created(_) => panic!("expected a conflict"),
        };
        assert_eq!(conflict.existing.object, "Graydon Hoare");
        assert_eq!(conflict.allowed_resolutions.len(), 3);

        let resolved = engine
            .resolve_conflict(&conflict.conflict_id, ConflictResolution::Reject)
            .await
            .expect("resolve");
        assert!(matches!(resolved, ResolveConflictOutcome::Rejected));

        let triples = engine.query_graph(TripleFilter::default()).expect("query_graph");
        assert_eq!(triples.items.len(), 1);
        assert_eq!(triples.items[0].object, "Graydon Hoare");
    }

    #[tokio::test]
    async fn merge_entities_reports_merged_count_and_rewrites_graph() {
        let engine = engine();
        let js = engine.upsert_entity("JavaScript").await.expect("js").entity;
        let short = engine.upsert_entity("JS").await.expect("js alias").entity;

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
            .expect("triple 1");
        engine
            .relate(NewTriple {
                subject: "closures".into(),
                predicate: "in".into(),
                object: "JS".into(),
                source: None,
                actor: None,
                confidence: None,
            })
            .await
            .expect("triple 2");

        let merged = engine.merge_entities(&js.id, &short.id).await.expect("merge");
        assert_eq!(merged.merged_count, 2);

        let graph = engine
            .query_graph(TripleFilter {
                subject: Some("JavaScript".into()),
                ..Default::default()
            })
            .expect("query_graph");
        assert_eq!(graph.items.len(), 1);
        assert_eq!(graph.items[0].object, "closures");
    }

    #[tokio::test]
    async fn policy_rejects_low_confidence_store() {
        let engine = engine();
        engine.policy().set_min_confidence(0.5);

        let low = engine
            .store(NewEntry {
                topic: "x".into(),
                content: "y".into(),
                confidence: Some(0.3),
                ..Default::default()
            })
            .await;
        assert_eq!(low.unwrap_err().kind(), "policy");

        let high = engine
            .store(NewEntry {
                topic: "x".into(),
                content: "y".into(),
                confidence: Some(0.8),
                ..Default::default()
            })
            .await;
        assert!(high.is_ok());
    }

    #[tokio::test]
    async fn ingest_dedup_reports_zero_creates_on_second_pass() {
        let engine = engine();
        let content = format!("{}\n\n\n{}", "A".repeat(300), "B".repeat(300));

        let first = engine.ingest(&content, None).await.expect("first ingest");
        match first {
            IngestOutcome::Sync(r) => {
                assert_eq!(r.entries_created, 2);
                assert_eq!(r.duplicates_skipped, 0);
            }
            IngestOutcome::Async { .. } => panic!("expected sync path"),
        }

        let second = engine.ingest(&content, None).await.expect("second ingest");
        match second {
            IngestOutcome::Sync(r) => {
                assert_eq!(r.entries_created, 0);
                assert_eq!(r.duplicates_skipped, 2);
            }
            IngestOutcome::Async { .. } => panic!("expected sync path"),
        }
    }

    #[tokio::test]
    async fn read_entries_paginates_by_id_descending() {
        let engine = engine();
        for i in 0..5 {
            engine
                .store(NewEntry {
                    topic: format!("topic {i}"),
                    content: "content".into(),
                    ..Default::default()
                })
                .await
                .expect("store");
        }

        let first_page = engine.read_entries(Some(2), None).expect("first page");
        assert_eq!(first_page.items.len(), 2);
        assert!(first_page.next_cursor.is_some());

        let second_page = engine
            .read_entries(Some(2), first_page.next_cursor.as_deref())
            .expect("second page");
        assert_eq!(second_page.items.len(), 2);

        let first_ids: std::collections::HashSet<_> =
            first_page.items.iter().map(|e| e.id.clone()).collect();
        assert!(second_page.items.iter().all(|e| !first_ids.contains(&e.id)));
    }
}
