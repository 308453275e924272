//! Domain models for the knowledge store

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A free-text knowledge record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: String,
    pub topic: String,
    pub content: String,
    pub tags: BTreeSet<String>,
    pub source: Option<String>,
    pub actor: Option<String>,
    pub confidence: Option<f64>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
    pub status: String,
    pub canonical_entity_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// Maximum length of `Entry::topic`.
pub const TOPIC_MAX_LEN: usize = 1000;
/// Maximum length of `Entry::content`.
pub const CONTENT_MAX_LEN: usize = 100_000;

/// A directed subject-predicate-object relationship.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Triple {
    pub id: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub source: Option<String>,
    pub actor: Option<String>,
    pub confidence: Option<f64>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

/// Maximum length of each triple field (subject/predicate/object).
pub const TRIPLE_FIELD_MAX_LEN: usize = 2000;

/// A named concept to which one or more aliases map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CanonicalEntity {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

/// A normalized (lowercased) string resolving to a canonical entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityAlias {
    pub id: String,
    pub alias: String,
    pub canonical_entity_id: String,
    pub created_at: String,
}

/// The kind of mutation a transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionOp {
    Create,
    Update,
    Delete,
    Merge,
    Revert,
}

impl TransactionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Merge => "MERGE",
            Self::Revert => "REVERT",
        }
    }
}

impl std::str::FromStr for TransactionOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "MERGE" => Ok(Self::Merge),
            "REVERT" => Ok(Self::Revert),
            other => Err(format!("unknown transaction op: {other}")),
        }
    }
}

/// The kind of row a transaction's `entity_id` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Entry,
    Triple,
    Entity,
    Alias,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Triple => "triple",
            Self::Entity => "entity",
            Self::Alias => "alias",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(Self::Entry),
            "triple" => Ok(Self::Triple),
            "entity" => Ok(Self::Entity),
            "alias" => Ok(Self::Alias),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// The append-only transaction log row.
///
/// Snapshots are opaque JSON blobs whose shape depends on `op`: a CREATE
/// carries a null `before`, a DELETE carries a null `after`, UPDATE/MERGE
/// carry both, and REVERT carries the swapped before/after of whatever it
/// inverted. See `snapshot` for the tagged-variant view used by the undo
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub op: TransactionOp,
    pub entity_type: EntityKind,
    pub entity_id: String,
    pub before_snapshot: Option<Value>,
    pub after_snapshot: Option<Value>,
    pub reverted_by: Option<String>,
    pub created_at: String,
}

/// Status of an ingestion task. May only move forward: pending ->
/// processing -> completed|failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::str::FromStr for IngestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown ingestion status: {other}")),
        }
    }
}

/// State of a pending or running bulk ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionTask {
    pub id: String,
    pub status: IngestionStatus,
    /// Either an external pointer or an inline JSON blob with
    /// `{content, source}`.
    pub input_uri: String,
    pub total_items: i64,
    pub processed_items: i64,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The resolutions a client may choose when presented with a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    Replace,
    RetainBoth,
    Reject,
}

/// An ephemeral, not-persisted record of a contradictory triple pair,
/// awaiting client resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub conflict_id: String,
    pub subject: String,
    pub predicate: String,
    pub existing: Triple,
    pub candidate: NewTriple,
    pub allowed_resolutions: Vec<ConflictResolution>,
}

/// Fields for a new entry, as supplied by a caller (before id/timestamps
/// are minted).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct NewEntry {
    pub topic: String,
    pub content: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub source: Option<String>,
    pub actor: Option<String>,
    pub confidence: Option<f64>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
}

/// Field-level overlay for an entry update. `Option<Option<T>>` lets an
/// explicit `null` in a request overwrite a field, while an absent field
/// (serialized as `#[serde(default)]`, i.e. missing from the JSON object)
/// preserves the existing value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EntryUpdate {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
    #[serde(default)]
    pub source: Option<Option<String>>,
    #[serde(default)]
    pub actor: Option<Option<String>>,
    #[serde(default)]
    pub confidence: Option<Option<f64>>,
}

/// Fields for a new triple, as supplied by a caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub source: Option<String>,
    pub actor: Option<String>,
    pub confidence: Option<f64>,
}

/// Field-level overlay for a triple update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TripleUpdate {
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub source: Option<Option<String>>,
    #[serde(default)]
    pub actor: Option<Option<String>>,
    #[serde(default)]
    pub confidence: Option<Option<f64>>,
}

/// A filter for `Database::query_entries`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct EntryFilter {
    pub topic: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub limit: Option<i64>,
}

/// A filter for `Database::query_triples`.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TripleFilter {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
    pub limit: Option<i64>,
}

/// Default and maximum page size shared across query operations.
pub const DEFAULT_QUERY_LIMIT: i64 = 50;
pub const MAX_QUERY_LIMIT: i64 = 200;

/// Default and maximum page size for hybrid retrieval.
pub const DEFAULT_RETRIEVAL_LIMIT: i64 = 20;
pub const MAX_RETRIEVAL_LIMIT: i64 = 200;

/// Request parameters for `retrieve`.
///
/// Offset-based pagination is not supported (retrieval is cursor-only);
/// `extra` captures any unrecognized fields the caller sent, including an
/// `offset`, so `Retriever::retrieve` can reject the request explicitly
/// instead of silently ignoring it.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RetrievalQuery {
    pub query: String,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub weights: Option<RetrievalWeightOverrides>,
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: std::collections::BTreeMap<String, Value>,
}

/// Caller-supplied overrides for the retriever's fusion weights.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct RetrievalWeightOverrides {
    pub lexical: Option<f64>,
    pub semantic: Option<f64>,
    pub graph: Option<f64>,
}

/// One hydrated, scored hit in a retrieval page.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry {
    pub entry: Entry,
    pub score_total: f64,
    pub lexical_score: f64,
    pub semantic_score: f64,
    pub graph_score: f64,
    pub graph_hops: Option<u32>,
}

/// A page of retrieval results.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalPage {
    pub items: Vec<ScoredEntry>,
    pub next_cursor: Option<String>,
    pub elapsed_ms: u64,
}
