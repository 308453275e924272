//! Memory Core Library
//!
//! Shared functionality for the single-owner knowledge store:
//! - Database access, migrations, and connection pooling
//! - Typed entries, graph triples, and canonical entities with provenance
//! - Append-only transaction log and multi-step undo
//! - Conflict detection and a session-scoped resolution cache
//! - Policy guardrails for required fields and confidence floors
//! - Three-signal hybrid retrieval (lexical, semantic, graph)
//! - Pluggable embedding, vector index, and change-notification backends
//! - Resumable asynchronous ingestion batching
//! - The structured operation envelope tying all of the above together

pub mod api;
pub mod collaborators;
pub mod config;
pub mod conflict;
pub mod conflict_cache;
pub mod db;
pub mod error;
pub mod id;
pub mod ingest;
pub mod models;
pub mod policy;
pub mod retriever;

pub use api::{
    DeletableKind, DeleteResult, Engine, IngestOutcome, MergeResult,
    QueryGraphPage, ReadPage, RelateOutcome, ResolveConflictOutcome, StoreResult,
    UpsertEntityResult, UpsertTripleResult,
};
pub use collaborators::{
    ChangeNotifier, Embedder, HttpEmbedder, InMemoryVectorIndex, LoggingChangeNotifier,
    MockEmbedder, MockVectorIndex, NoopChangeNotifier, VectorIndex,
};
pub use config::RetrievalWeights;
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{IngestionBatch, SyncIngestResult};
pub use models::{
    CanonicalEntity, ConflictInfo, ConflictResolution, Entry, EntryFilter, EntryUpdate,
    EntityAlias, EntityKind, IngestionStatus, IngestionTask, NewEntry, NewTriple,
    RetrievalQuery, RetrievalPage, ScoredEntry, Transaction, TransactionOp, Triple,
    TripleFilter, TripleUpdate,
};
pub use policy::{PolicyConfig, PolicyEngine};
