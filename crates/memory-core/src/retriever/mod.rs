//! Hybrid retriever: lexical, semantic, and graph scorers fused and paginated

mod cursor;
mod graph;
mod lexical;
mod semantic;

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::collaborators::{Embedder, VectorIndex};
use crate::config::RetrievalWeights;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    RetrievalPage, RetrievalQuery, ScoredEntry, DEFAULT_RETRIEVAL_LIMIT, MAX_RETRIEVAL_LIMIT,
};

/// Encode a row id as an opaque pagination cursor. Shared by the read
/// resources outside retrieval (`entries`, `triples`, `transactions`),
/// which reuse the same opaque-base64-of-id scheme.
pub fn encode_cursor(id: &str) -> String {
    cursor::encode(id)
}

/// Decode an opaque pagination cursor back to a row id, or `None` for an
/// invalid cursor.
pub fn decode_cursor(cursor: &str) -> Option<String> {
    cursor::decode(cursor)
}

/// Runs the three-signal hybrid retrieval pipeline: parallel lexical and
/// semantic scoring, a dependent single-hop graph expansion over their
/// seeds, weighted fusion, deterministic ordering, cursor pagination, and
/// hydration.
pub struct Retriever<'a> {
    db: &'a Database,
    embedder: Option<&'a (dyn Embedder)>,
    vector_index: Option<&'a (dyn VectorIndex)>,
}

impl<'a> Retriever<'a> {
    pub fn new(
        db: &'a Database,
        embedder: Option<&'a (dyn Embedder)>,
        vector_index: Option<&'a (dyn VectorIndex)>,
    ) -> Self {
        Self {
            db,
            embedder,
            vector_index,
        }
    }

    pub async fn retrieve(&self, query: RetrievalQuery) -> Result<RetrievalPage> {
        if query.query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".into()));
        }
        if query.extra.contains_key("offset") {
            return Err(Error::Validation(
                "offset is not supported; retrieval is paginated by cursor only".into(),
            ));
        }

        let started = Instant::now();
        let limit = query
            .limit
            .unwrap_or(DEFAULT_RETRIEVAL_LIMIT)
            .clamp(1, MAX_RETRIEVAL_LIMIT);
        let depth = limit * 3;

        let mut weights = query
            .weights
            .as_ref()
            .map(|overrides| RetrievalWeights {
                lexical: overrides.lexical.unwrap_or(RetrievalWeights::default().lexical),
                semantic: overrides.semantic.unwrap_or(RetrievalWeights::default().semantic),
                graph: overrides.graph.unwrap_or(RetrievalWeights::default().graph),
            })
            .unwrap_or_default();

        let (lexical_scores, semantic_scores) = tokio::join!(
            lexical_scores(self.db, &query.query, depth),
            semantic::score(self.embedder, self.vector_index, &query.query, depth),
        );
        let lexical_scores = lexical_scores?;

        if semantic_scores.is_empty() {
            weights = weights.without_semantic();
        }

        let mut seed_ids: HashSet<String> = HashSet::new();
        seed_ids.extend(lexical_scores.keys().cloned());
        seed_ids.extend(semantic_scores.keys().cloned());

        let seed_topics = seed_topics(self.db, &seed_ids)?;
        let graph_scores = graph::score(self.db, &seed_topics, &seed_ids)?;

        let fused = fuse(&lexical_scores, &semantic_scores, &graph_scores, &weights);

        let mut ordered: Vec<(String, f64)> = fused.into_iter().collect();
        ordered.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let start_index = match query.cursor.as_deref().and_then(cursor::decode) {
            Some(after_id) => ordered
                .iter()
                .position(|(id, _)| *id == after_id)
                .map(|pos| pos + 1)
                .unwrap_or(0),
            None => 0,
        };

        let page: Vec<(String, f64)> = ordered
            .iter()
            .skip(start_index)
            .take(limit as usize)
            .cloned()
            .collect();
        let next_cursor = if start_index + page.len() < ordered.len() {
            page.last().map(|(id, _)| cursor::encode(id))
        } else {
            None
        };

        let mut items = Vec::with_capacity(page.len());
        for (id, score_total) in page {
            let entry = self.db.get_entry(&id)?;
            items.push(ScoredEntry {
                entry,
                score_total,
                lexical_score: lexical_scores.get(&id).copied().unwrap_or(0.0),
                semantic_score: semantic_scores.get(&id).copied().unwrap_or(0.0),
                graph_score: graph_scores.get(&id).copied().unwrap_or(0.0),
                graph_hops: graph_scores.get(&id).map(|_| 1),
            });
        }

        Ok(RetrievalPage {
            items,
            next_cursor,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

async fn lexical_scores(db: &Database, query: &str, depth: i64) -> Result<HashMap<String, f64>> {
    lexical::score(db, query, depth)
}

fn seed_topics(db: &Database, ids: &HashSet<String>) -> Result<Vec<String>> {
    let mut topics = Vec::with_capacity(ids.len());
    for id in ids {
        topics.push(db.get_entry(id)?.topic);
    }
    Ok(topics)
}

fn fuse(
    lexical: &HashMap<String, f64>,
    semantic: &HashMap<String, f64>,
    graph: &HashMap<String, f64>,
    weights: &RetrievalWeights,
) -> HashMap<String, f64> {
    let mut fused: HashMap<String, f64> = HashMap::new();
    for id in lexical.keys().chain(semantic.keys()).chain(graph.keys()) {
        let score = lexical.get(id).copied().unwrap_or(0.0) * weights.lexical
            + semantic.get(id).copied().unwrap_or(0.0) * weights.semantic
            + graph.get(id).copied().unwrap_or(0.0) * weights.graph;
        fused.insert(id.clone(), score);
    }
    fused
}
