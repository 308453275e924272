//! Lexical scorer: FTS5 BM25 when available, tiered substring fallback otherwise

use std::collections::HashMap;

use rusqlite::params;

use crate::db::{escape_like, Database};
use crate::error::Result;

/// Score candidates for `query`, returning at most `depth` `(entry_id,
/// score)` pairs with score normalized to `[0, 1]`.
pub fn score(db: &Database, query: &str, depth: i64) -> Result<HashMap<String, f64>> {
    if db.fts_available() {
        match score_fts(db, query, depth) {
            Ok(scores) if !scores.is_empty() => return Ok(scores),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "fts5 lexical scorer failed, falling back to substring");
            }
        }
    }
    score_substring(db, query, depth)
}

fn fts_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn score_fts(db: &Database, query: &str, depth: i64) -> Result<HashMap<String, f64>> {
    let conn = db.conn()?;
    let fts = fts_query(query);
    if fts.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let mut stmt = conn.prepare(
        "SELECT id, bm25(entries_fts) AS rank FROM entries_fts \
         WHERE entries_fts MATCH ?1 ORDER BY rank LIMIT ?2",
    )?;
    let rows: Vec<(String, f64)> = stmt
        .query_map(params![fts, depth], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    // bm25() in SQLite's FTS5 returns a more-negative value for a better
    // match. Normalize against the best (most negative) score in the page
    // so the worst-matching row in the page scores near 0 and the best
    // scores 1.
    let best = rows.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
    if !best.is_finite() || best == 0.0 {
        return Ok(rows.into_iter().map(|(id, _)| (id, 1.0)).collect());
    }

    Ok(rows
        .into_iter()
        .map(|(id, rank)| (id, (rank / best).clamp(0.0, 1.0)))
        .collect())
}

fn score_substring(db: &Database, query: &str, depth: i64) -> Result<HashMap<String, f64>> {
    let conn = db.conn()?;
    let escaped = escape_like(query);
    let pattern = format!("%{escaped}%");

    let mut stmt = conn.prepare(
        "SELECT id, topic, content, tags FROM entries \
         WHERE deleted_at IS NULL AND (topic LIKE ?1 ESCAPE '\\' \
         OR content LIKE ?1 ESCAPE '\\' OR tags LIKE ?1 ESCAPE '\\') \
         LIMIT ?2",
    )?;

    let lowered_query = query.to_lowercase();
    let rows: Vec<(String, f64)> = stmt
        .query_map(params![pattern, depth], |row| {
            let id: String = row.get(0)?;
            let topic: String = row.get(1)?;
            let content: String = row.get(2)?;
            let tags: String = row.get(3)?;

            let topic_lower = topic.to_lowercase();
            let score = if topic_lower == lowered_query {
                1.0
            } else if topic_lower.contains(&lowered_query) {
                0.8
            } else if content.to_lowercase().contains(&lowered_query) {
                0.5
            } else if tags.to_lowercase().contains(&lowered_query) {
                0.3
            } else {
                0.0
            };
            Ok((id, score))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows.into_iter().filter(|(_, score)| *score > 0.0).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEntry;

    #[test]
    fn substring_scorer_ranks_exact_topic_highest() {
        let db = Database::in_memory().expect("db");
        db.create_entry(NewEntry {
            topic: "rust".into(),
            content: "a systems language".into(),
            ..Default::default()
        })
        .expect("create");
        db.create_entry(NewEntry {
            topic: "javascript".into(),
            content: "rust is mentioned here".into(),
            ..Default::default()
        })
        .expect("create");

        let scores = score_substring(&db, "rust", 10).expect("score");
        assert_eq!(scores.len(), 2);
        let exact = scores.values().cloned().fold(0.0, f64::max);
        assert_eq!(exact, 1.0);
    }

    #[test]
    fn substring_scorer_escapes_wildcards() {
        let db = Database::in_memory().expect("db");
        db.create_entry(NewEntry {
            topic: "100%_off".into(),
            content: "a sale".into(),
            ..Default::default()
        })
        .expect("create");

        let scores = score_substring(&db, "100%", 10).expect("score");
        assert_eq!(scores.len(), 1);
    }
}
