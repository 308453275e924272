//! Conflict detection between triples sharing a (subject, predicate) scope

use crate::db::Database;
use crate::error::Result;
use crate::models::{ConflictInfo, ConflictResolution, NewTriple};

/// Given an incoming `(subject, predicate, object)` candidate, look for an
/// active triple with the same subject and predicate but a different
/// object. Same-object is not a conflict. Returns at most one existing
/// triple even if several contradict the candidate — the first one found
/// is representative.
pub fn detect_conflict(db: &Database, candidate: &NewTriple) -> Result<Option<ConflictInfo>> {
    let existing = db.triples_with_subject_predicate(&candidate.subject, &candidate.predicate)?;

    let contradiction = existing.into_iter().find(|t| t.object != candidate.object);

    Ok(contradiction.map(|existing| ConflictInfo {
        conflict_id: crate::id::new_id(),
        subject: candidate.subject.clone(),
        predicate: candidate.predicate.clone(),
        existing,
        candidate: candidate.clone(),
        allowed_resolutions: vec![
            ConflictResolution::Replace,
            ConflictResolution::RetainBoth,
            ConflictResolution::Reject,
        ],
    }))
}
