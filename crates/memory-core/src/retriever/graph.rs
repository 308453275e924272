//! Graph scorer: single-hop neighborhood expansion from seed topics

use std::collections::{HashMap, HashSet};

use crate::db::Database;
use crate::error::Result;
use crate::models::Entry;

/// Given the topics of the current lexical/semantic seed candidates,
/// find every active triple touching one of those topics, collect the
/// terms on the opposite side, and score entries whose topic equals one
/// of those terms (excluding ids already in `seed_ids`) at `1 / (1 +
/// hops)` with `hops = 1`.
pub fn score(
    db: &Database,
    seed_topics: &[String],
    seed_ids: &HashSet<String>,
) -> Result<HashMap<String, f64>> {
    let mut neighbor_terms: HashSet<String> = HashSet::new();

    for topic in seed_topics {
        for triple in db.triples_touching(topic)? {
            if triple.subject == *topic {
                neighbor_terms.insert(triple.object);
            } else {
                neighbor_terms.insert(triple.subject);
            }
        }
    }

    if neighbor_terms.is_empty() {
        return Ok(HashMap::new());
    }

    let mut scores = HashMap::new();
    for term in &neighbor_terms {
        for entry in entries_with_topic(db, term)? {
            if seed_ids.contains(&entry.id) {
                continue;
            }
            scores.entry(entry.id).or_insert(1.0 / (1.0 + 1.0));
        }
    }

    Ok(scores)
}

fn entries_with_topic(db: &Database, topic: &str) -> Result<Vec<Entry>> {
    db.entries_with_exact_topic(topic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewEntry, NewTriple};

    #[test]
    fn expands_one_hop_from_seed_topic() {
        let db = Database::in_memory().expect("db");
        let seed = db
            .create_entry(NewEntry {
                topic: "rust".into(),
                content: "a systems language".into(),
                ..Default::default()
            })
            .expect("create seed");
        let neighbor = db
            .create_entry(NewEntry {
                topic: "graydon hoare".into(),
                content: "created rust".into(),
                ..Default::default()
            })
            .expect("create neighbor");
        db.create_triple(NewTriple {
            subject: "rust".into(),
            predicate: "created_by".into(),
            object: "graydon hoare".into(),
            source: None,
            actor: None,
            confidence: None,
        })
        .expect("create triple");

        let mut seed_ids = HashSet::new();
        seed_ids.insert(seed.id.clone());

        let scores = score(&db, &["rust".to_string()], &seed_ids).expect("score");
        assert_eq!(scores.get(&neighbor.id), Some(&0.5));
        assert!(!scores.contains_key(&seed.id));
    }

    #[test]
    fn no_triples_yields_empty_scores() {
        let db = Database::in_memory().expect("db");
        let scores = score(&db, &["nothing".to_string()], &HashSet::new()).expect("score");
        assert!(scores.is_empty());
    }
}
