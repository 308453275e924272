//! Canonical entity creation, aliasing, resolution, and merge

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::id::{new_id, now};
use crate::models::{CanonicalEntity, EntityKind, TransactionOp};

use super::{escape_like, Database};

fn row_to_entity(row: &rusqlite::Row) -> rusqlite::Result<CanonicalEntity> {
    Ok(CanonicalEntity {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    /// Create a canonical entity and its first alias (the lowercased
    /// name) in one atomic batch.
    pub fn create_entity(&self, name: &str) -> Result<CanonicalEntity> {
        if name.trim().is_empty() {
            return Err(Error::Validation("entity name must not be empty".into()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let id = new_id();
        let ts = now();
        tx.execute(
            "INSERT INTO canonical_entities (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id, name, ts],
        )?;

        let alias_id = new_id();
        tx.execute(
            "INSERT INTO entity_aliases (id, alias, canonical_entity_id, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![alias_id, name.to_lowercase(), id, ts],
        )?;

        let entity = CanonicalEntity {
            id: id.clone(),
            name: name.to_string(),
            created_at: ts,
        };

        super::transactions::log_transaction(
            &tx,
            TransactionOp::Create,
            EntityKind::Entity,
            &id,
            None,
            Some(&serde_json::to_value(&entity).unwrap_or(Value::Null)),
        )?;

        tx.commit()?;
        Ok(entity)
    }

    pub fn get_entity(&self, id: &str) -> Result<CanonicalEntity> {
        let conn = self.conn()?;
        get_entity_tx(&conn, id)
    }

    /// Attach a new alias to an existing canonical entity. Rejects an
    /// unknown `entity_id`.
    pub fn add_alias(&self, entity_id: &str, alias: &str) -> Result<()> {
        if alias.trim().is_empty() {
            return Err(Error::Validation("alias must not be empty".into()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        get_entity_tx(&tx, entity_id)?;

        let alias_id = new_id();
        let ts = now();
        tx.execute(
            "INSERT INTO entity_aliases (id, alias, canonical_entity_id, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![alias_id, alias.to_lowercase(), entity_id, ts],
        )?;

        super::transactions::log_transaction(
            &tx,
            TransactionOp::Create,
            EntityKind::Alias,
            &alias_id,
            None,
            Some(&json!({"alias": alias.to_lowercase(), "canonical_entity_id": entity_id})),
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Resolve a name to its canonical entity: an exact (case-insensitive)
    /// alias match first, then a substring fallback if nothing matches
    /// exactly.
    pub fn resolve(&self, name: &str) -> Result<Option<CanonicalEntity>> {
        if let Some(exact) = self.resolve_exact(name)? {
            return Ok(Some(exact));
        }

        let conn = self.conn()?;
        let pattern = format!("%{}%", escape_like(&name.to_lowercase()));
        let fuzzy: Option<CanonicalEntity> = conn
            .query_row(
                "SELECT e.* FROM canonical_entities e \
                 JOIN entity_aliases a ON a.canonical_entity_id = e.id \
                 WHERE a.alias LIKE ?1 ESCAPE '\\' LIMIT 1",
                params![pattern],
                row_to_entity,
            )
            .optional()?;

        Ok(fuzzy)
    }

    /// Exact (case-insensitive) alias match only, with no fuzzy fallback.
    /// Used by upsert so a fuzzy near-miss never collides with an
    /// unrelated entity.
    pub fn resolve_exact(&self, name: &str) -> Result<Option<CanonicalEntity>> {
        let conn = self.conn()?;
        let lowered = name.to_lowercase();
        conn.query_row(
            "SELECT e.* FROM canonical_entities e \
             JOIN entity_aliases a ON a.canonical_entity_id = e.id \
             WHERE a.alias = ?1 LIMIT 1",
            params![lowered],
            row_to_entity,
        )
        .optional()
        .map_err(Error::from)
    }

    /// Merge `merge_id` into `keep_id`: rewrite every triple, entry, and
    /// alias referencing `merge_id` to reference `keep_id`, then delete
    /// the merged entity row. Rejects a self-merge. The transaction log
    /// snapshot carries every id touched so `revert_merge` can invert it
    /// exactly.
    pub fn merge_entities(&self, keep_id: &str, merge_id: &str) -> Result<MergeOutcome> {
        if keep_id == merge_id {
            return Err(Error::Validation(
                "cannot merge an entity into itself".into(),
            ));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let keep = get_entity_tx(&tx, keep_id)?;
        let merge = get_entity_tx(&tx, merge_id)?;

        // Triples reference entities by their literal name text (there is
        // no canonical_entity_id column on triples), so reassignment
        // matches on name, unlike entries which carry a real FK.
        let (subj_triple_ids, obj_triple_ids) =
            super::triples::reassign_entity_references(&tx, &merge.name, &keep.name)?;
        let merge_entry_ids = super::entries::reassign_canonical_entity(&tx, merge_id, keep_id)?;

        let mut alias_stmt =
            tx.prepare("SELECT id FROM entity_aliases WHERE canonical_entity_id = ?1")?;
        let merge_alias_ids: Vec<String> = alias_stmt
            .query_map(params![merge_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(alias_stmt);

        tx.execute(
            "UPDATE entity_aliases SET canonical_entity_id = ?1 WHERE canonical_entity_id = ?2",
            params![keep_id, merge_id],
        )?;

        let new_alias_id = new_id();
        let ts = now();
        tx.execute(
            "INSERT INTO entity_aliases (id, alias, canonical_entity_id, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![new_alias_id, merge.name.to_lowercase(), keep_id, ts],
        )?;

        tx.execute(
            "DELETE FROM canonical_entities WHERE id = ?1",
            params![merge_id],
        )?;

        let merged_count = {
            let mut touched: std::collections::HashSet<&String> = subj_triple_ids.iter().collect();
            touched.extend(obj_triple_ids.iter());
            touched.len() as i64
        };

        let before = json!({
            "keep_id": keep_id,
            "keep_name": keep.name,
            "merge_id": merge_id,
            "merge_name": merge.name,
            "merge_created_at": merge.created_at,
            "subj_triple_ids": subj_triple_ids,
            "obj_triple_ids": obj_triple_ids,
            "merge_entry_ids": merge_entry_ids,
            "merge_alias_ids": merge_alias_ids,
            "new_alias_id": new_alias_id,
        });

        let after = json!({ "keep_id": keep_id, "keep_name": keep.name });

        super::transactions::log_transaction(
            &tx,
            TransactionOp::Merge,
            EntityKind::Entity,
            keep_id,
            Some(&before),
            Some(&after),
        )?;

        tx.commit()?;
        Ok(MergeOutcome { keep, merged_count })
    }
}

/// Result of a successful `merge_entities` call.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub keep: CanonicalEntity,
    pub merged_count: i64,
}

/// Invert a CREATE transaction for an entity or alias row. Neither table
/// has a `deleted_at` column, so the inverse is a hard delete rather than
/// the soft-delete `set_deleted_at` uses for entries/triples. A missing
/// row (e.g. the entity was since merged away) is a no-op, not an error.
pub(super) fn revert_create(conn: &Connection, entity_type: EntityKind, entity_id: &str) -> Result<()> {
    match entity_type {
        EntityKind::Entity => {
            conn.execute(
                "DELETE FROM entity_aliases WHERE canonical_entity_id = ?1",
                params![entity_id],
            )?;
            conn.execute(
                "DELETE FROM canonical_entities WHERE id = ?1",
                params![entity_id],
            )?;
        }
        EntityKind::Alias => {
            conn.execute("DELETE FROM entity_aliases WHERE id = ?1", params![entity_id])?;
        }
        other => {
            return Err(Error::Internal(format!(
                "entity kind {other:?} has no CREATE reversal path"
            )))
        }
    }
    Ok(())
}

fn get_entity_tx(conn: &Connection, id: &str) -> Result<CanonicalEntity> {
    conn.query_row(
        "SELECT * FROM canonical_entities WHERE id = ?1",
        params![id],
        row_to_entity,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("entity {id} not found")))
}

/// Invert a MERGE transaction using the id lists captured in its
/// `before_snapshot`: recreate the merged entity row, point every
/// captured triple/entry/alias id back at it, and drop the alias that
/// merge had added for the merged entity's name.
pub(super) fn revert_merge(conn: &Connection, before: &Value) -> Result<()> {
    let merge_id = before["merge_id"]
        .as_str()
        .ok_or_else(|| Error::Internal("merge snapshot missing merge_id".into()))?;
    let merge_name = before["merge_name"]
        .as_str()
        .ok_or_else(|| Error::Internal("merge snapshot missing merge_name".into()))?;
    let merge_created_at = before["merge_created_at"]
        .as_str()
        .ok_or_else(|| Error::Internal("merge snapshot missing merge_created_at".into()))?;
    let new_alias_id = before["new_alias_id"]
        .as_str()
        .ok_or_else(|| Error::Internal("merge snapshot missing new_alias_id".into()))?;

    let subj_triple_ids: Vec<String> = serde_json::from_value(before["subj_triple_ids"].clone())
        .map_err(|e| Error::Internal(format!("malformed merge snapshot: {e}")))?;
    let obj_triple_ids: Vec<String> = serde_json::from_value(before["obj_triple_ids"].clone())
        .map_err(|e| Error::Internal(format!("malformed merge snapshot: {e}")))?;
    let merge_entry_ids: Vec<String> = serde_json::from_value(before["merge_entry_ids"].clone())
        .map_err(|e| Error::Internal(format!("malformed merge snapshot: {e}")))?;
    let merge_alias_ids: Vec<String> = serde_json::from_value(before["merge_alias_ids"].clone())
        .map_err(|e| Error::Internal(format!("malformed merge snapshot: {e}")))?;

    conn.execute(
        "INSERT INTO canonical_entities (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![merge_id, merge_name, merge_created_at],
    )?;

    super::triples::restore_entity_references(conn, &subj_triple_ids, &obj_triple_ids, merge_name)?;

    for entry_id in &merge_entry_ids {
        conn.execute(
            "UPDATE entries SET canonical_entity_id = ?1 WHERE id = ?2",
            params![merge_id, entry_id],
        )?;
    }

    for alias_id in &merge_alias_ids {
        conn.execute(
            "UPDATE entity_aliases SET canonical_entity_id = ?1 WHERE id = ?2",
            params![merge_id, alias_id],
        )?;
    }

    conn.execute(
        "DELETE FROM entity_aliases WHERE id = ?1",
        params![new_alias_id],
    )?;

    Ok(())
}
