//! Process-local vector index backed by a `RwLock<Vec<_>>`
//!
//! The real production deployment would swap this for an external vector
//! database; this is the collaborator the engine falls back to when no
//! such service is configured, doing a brute-force cosine scan. Fine at
//! the scale a single-owner memory store operates at.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;

use super::VectorIndex;

pub struct InMemoryVectorIndex {
    entries: RwLock<Vec<(String, Vec<f32>)>>,
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
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
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, entry_id: &str, vector: &[f32]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(id, _)| id != entry_id);
        entries.push((entry_id.to_string(), vector.to_vec()));
        Ok(())
    }

    async fn remove(&self, entry_id: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|(id, _)| id != entry_id);
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<(String, f32)> = entries
            .iter()
            .map(|(id, vector)| (id.clone(), cosine_similarity(query, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(id, sim)| (id, (sim + 1.0) / 2.0))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_returns_empty_when_no_vectors_indexed() {
        let index = InMemoryVectorIndex::new();
        assert!(index.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_then_remove_drops_the_vector() {
        let index = InMemoryVectorIndex::new();
        index.upsert("a", &[1.0, 0.0]).await.unwrap();
        index.remove("a").await.unwrap();
        assert!(index.search(&[1.0, 0.0], 5).await.unwrap().is_empty());
    }
}
