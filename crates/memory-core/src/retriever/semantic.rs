//! Semantic scorer: embed the query and look up nearest neighbors
//!
//! Degrades to an empty result — never an error — when either
//! collaborator is absent or a call fails; the caller redistributes the
//! semantic weight to lexical and graph in that case.

use std::collections::HashMap;

use crate::collaborators::{Embedder, VectorIndex};

pub async fn score(
    embedder: Option<&(dyn Embedder)>,
    vector_index: Option<&(dyn VectorIndex)>,
    query: &str,
    depth: i64,
) -> HashMap<String, f64> {
    let (Some(embedder), Some(vector_index)) = (embedder, vector_index) else {
        return HashMap::new();
    };

    let vector = match embedder.embed(query).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "semantic scorer: embedding failed, degrading to empty");
            return HashMap::new();
        }
    };

    match vector_index.search(&vector, depth.max(0) as usize).await {
        Ok(hits) => hits.into_iter().collect(),
        Err(e) => {
            tracing::warn!(error = %e, "semantic scorer: vector search failed, degrading to empty");
            HashMap::new()
        }
    }
}
