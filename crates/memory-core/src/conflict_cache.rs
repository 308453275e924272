//! Session-scoped cache of pending conflicts awaiting client resolution
//!
//! Conflicts are ephemeral: never written to the primary tables, held
//! only long enough for a client to call `resolve_conflict`. Entries
//! expire after a 1-hour time-to-live and the cache is bounded to 100
//! entries with first-insertion eviction once full, matching the scoping
//! note in §4.9 that the core is single-writer per session and never
//! needs cross-process coordination for this state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::ConflictInfo;

const TTL: Duration = Duration::from_secs(3600);
const CAPACITY: usize = 100;

struct Entry {
    conflict: ConflictInfo,
    stored_at: Instant,
}

/// Bounded, TTL-evicting store for conflicts awaiting resolution.
#[derive(Default)]
pub struct ConflictCache {
    entries: HashMap<String, Entry>,
    insertion_order: Vec<String>,
}

impl ConflictCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a conflict under its own `conflict_id`. Evicts the oldest
    /// entry by insertion order if the cache is at capacity.
    pub fn save(&mut self, conflict: ConflictInfo) {
        let id = conflict.conflict_id.clone();
        if !self.entries.contains_key(&id) && self.entries.len() >= CAPACITY {
            if let Some(oldest) = first_live_id(&self.insertion_order) {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            id.clone(),
            Entry {
                conflict,
                stored_at: Instant::now(),
            },
        );
        self.insertion_order.retain(|existing| existing != &id);
        self.insertion_order.push(id);
    }

    /// Load a conflict by id. Returns `None` and evicts the entry if its
    /// TTL has elapsed.
    pub fn load(&mut self, conflict_id: &str) -> Option<ConflictInfo> {
        let expired = match self.entries.get(conflict_id) {
            Some(entry) => entry.stored_at.elapsed() > TTL,
            None => return None,
        };
        if expired {
            self.remove(conflict_id);
            return None;
        }
        self.entries.get(conflict_id).map(|e| e.conflict.clone())
    }

    /// Remove a conflict, consumed once it has been resolved.
    pub fn remove(&mut self, conflict_id: &str) -> Option<ConflictInfo> {
        self.insertion_order.retain(|id| id != conflict_id);
        self.entries.remove(conflict_id).map(|e| e.conflict)
    }
}

fn first_live_id(order: &[String]) -> Option<String> {
    order.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictResolution, NewTriple, Triple};

    fn sample_conflict(id: &str) -> ConflictInfo {
        ConflictInfo {
            conflict_id: id.to_string(),
            subject: "rust".into(),
            predicate: "created_by".into(),
            existing: Triple {
                id: "t1".into(),
                subject: "rust".into(),
                predicate: "created_by".into(),
                object: "graydon hoare".into(),
                source: None,
                actor: None,
                confidence: None,
                valid_from: None,
                valid_to: None,
                status: "active".into(),
                created_at: "2020-01-01T00:00:00.000Z".into(),
                updated_at: "2020-01-01T00:00:00.000Z".into(),
                deleted_at: None,
            },
            candidate: NewTriple {
                subject: "rust".into(),
                predicate: "created_by".into(),
                object: "someone else".into(),
                source: None,
                actor: None,
                confidence: None,
            },
            allowed_resolutions: vec![
                ConflictResolution::Replace,
                ConflictResolution::RetainBoth,
                ConflictResolution::Reject,
            ],
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut cache = ConflictCache::new();
        cache.save(sample_conflict("c1"));
        let loaded = cache.load("c1").expect("present");
        assert_eq!(loaded.conflict_id, "c1");
    }

    #[test]
    fn load_missing_returns_none() {
        let mut cache = ConflictCache::new();
        assert!(cache.load("missing").is_none());
    }

    #[test]
    fn remove_consumes_the_entry() {
        let mut cache = ConflictCache::new();
        cache.save(sample_conflict("c1"));
        assert!(cache.remove("c1").is_some());
        assert!(cache.load("c1").is_none());
    }

    #[test]
    fn capacity_pressure_evicts_oldest_insertion() {
        let mut cache = ConflictCache::new();
        for i in 0..CAPACITY {
            cache.save(sample_conflict(&format!("c{i}")));
        }
        assert!(cache.load("c0").is_some());

        cache.save(sample_conflict("overflow"));
        assert!(cache.load("c0").is_none());
        assert!(cache.load("overflow").is_some());
    }
}
