//! In-test stand-ins for the external collaborators

use async_trait::async_trait;

use crate::error::Result;

use super::{ChangeNotifier, Embedder, VectorIndex};

/// Deterministic embedder for tests: hashes the text into a fixed-length
/// vector so equal inputs produce equal vectors without calling out to a
/// real model.
#[derive(Clone, Default)]
pub struct MockEmbedder {
    pub healthy: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self { healthy: true }
    }

    pub fn unhealthy() -> Self {
        Self { healthy: false }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if !self.healthy {
            return Err(crate::error::Error::Dependency("mock embedder is down".into()));
        }
        const DIMS: usize = 16;
        let mut vector = vec![0.0f32; DIMS];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % DIMS] += byte as f32;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        "mock"
    }
}

/// In-process vector index backed by a `Vec`, used for tests and as the
/// default when no real vector store is configured.
#[derive(Default)]
pub struct MockVectorIndex {
    entries: std::sync::Mutex<Vec<(String, Vec<f32>)>>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

#[async_trait]
impl VectorIndex for MockVectorIndex {
    async fn upsert(&self, entry_id: &str, vector: &[f32]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(id, _)| id != entry_id);
        entries.push((entry_id.to_string(), vector.to_vec()));
        Ok(())
    }

    async fn remove(&self, entry_id: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(id, _)| id != entry_id);
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<(String, f32)> = entries
            .iter()
            .map(|(id, vector)| (id.clone(), cosine_similarity(query, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        // Cosine similarity ranges [-1, 1]; rescale to the [0, 1] contract.
        Ok(scored
            .into_iter()
            .map(|(id, sim)| (id, (sim + 1.0) / 2.0))
            .collect())
    }
}

/// Drops every notification. The default when no notification sink is
/// configured.
#[derive(Default)]
pub struct NoopChangeNotifier;

#[async_trait]
impl ChangeNotifier for NoopChangeNotifier {
    async fn notify(&self, _resource_uris: &[String]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new();
        let a = embedder.embed("rust").await.unwrap();
        let b = embedder.embed("rust").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_embedder_unhealthy_fails() {
        let embedder = MockEmbedder::unhealthy();
        assert!(embedder.embed("rust").await.is_err());
    }

    #[tokio::test]
    async fn mock_vector_index_returns_best_match_first() {
        let index = MockVectorIndex::new();
        let a = MockEmbedder::new().embed("rust ownership").await.unwrap();
        let b = MockEmbedder::new().embed("javascript closures").await.unwrap();
        index.upsert("entry-a", &a).await.unwrap();
        index.upsert("entry-b", &b).await.unwrap();

        let results = index.search(&a, 2).await.unwrap();
        assert_eq!(results[0].0, "entry-a");
    }

    #[tokio::test]
    async fn mock_vector_index_remove_drops_entry() {
        let index = MockVectorIndex::new();
        let a = MockEmbedder::new().embed("rust").await.unwrap();
        index.upsert("entry-a", &a).await.unwrap();
        index.remove("entry-a").await.unwrap();
        assert!(index.search(&a, 5).await.unwrap().is_empty());
    }
}
