//! Pluggable external collaborator abstractions
//!
//! These are the seams at which the engine reaches outside its own
//! storage: embedding generation, nearest-neighbor lookup, and
//! change-notification delivery. Each is a trait with a `Mock`/local
//! implementation colocated here, mirroring the teacher's
//! `AIBackend`/`MockBackend`/`OllamaBackend` grouping — trait and
//! implementations live in one crate rather than being split out.
//!
//! Every collaborator call is fallible and failures are caught by the
//! caller rather than propagated: a missing or failing `Embedder` or
//! `VectorIndex` degrades the semantic retrieval scorer to empty, and a
//! failing `ChangeNotifier` is logged and otherwise ignored.

mod http_embedder;
mod in_memory_vector_index;
mod log_notifier;
mod mock;

pub use http_embedder::HttpEmbedder;
pub use in_memory_vector_index::InMemoryVectorIndex;
pub use log_notifier::LoggingChangeNotifier;
pub use mock::{MockEmbedder, MockVectorIndex, NoopChangeNotifier};

use async_trait::async_trait;

use crate::error::Result;

/// Turns text into a dense vector for nearest-neighbor search.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, surfaced in logs and diagnostics.
    fn model(&self) -> &str;
}

/// A nearest-neighbor index over entry ids keyed by embedding vector.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector for `entry_id`.
    async fn upsert(&self, entry_id: &str, vector: &[f32]) -> Result<()>;

    /// Remove the vector for `entry_id`, if present.
    async fn remove(&self, entry_id: &str) -> Result<()>;

    /// Top-k nearest neighbors to `query`, as `(entry_id, similarity)`
    /// pairs with similarity in `[0, 1]`, best first.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>>;
}

/// Notified once per committed mutation with the affected resource URIs
/// (e.g. `entry:<id>`, `triple:<id>`).
#[async_trait]
pub trait ChangeNotifier: Send + Sync {
    async fn notify(&self, resource_uris: &[String]);
}
