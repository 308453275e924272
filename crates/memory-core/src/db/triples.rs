//! Triple CRUD and upsert

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::id::{new_id, now};
use crate::models::{
    NewTriple, Triple, TripleFilter, TripleUpdate, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT,
    TRIPLE_FIELD_MAX_LEN,
};

use super::{escape_like, Database};

fn validate_new(new: &NewTriple) -> Result<()> {
    for (name, value) in [
        ("subject", &new.subject),
        ("predicate", &new.predicate),
        ("object", &new.object),
    ] {
        if value.trim().is_empty() {
            return Err(Error::Validation(format!("{name} must not be empty")));
        }
        if value.len() > TRIPLE_FIELD_MAX_LEN {
            return Err(Error::Validation(format!(
                "{name} exceeds {TRIPLE_FIELD_MAX_LEN} characters"
            )));
        }
    }
    if let Some(c) = new.confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(Error::Validation("confidence must be in [0, 1]".into()));
        }
    }
    Ok(())
}

fn row_to_triple(row: &rusqlite::Row) -> rusqlite::Result<Triple> {
    Ok(Triple {
        id: row.get("id")?,
        subject: row.get("subject")?,
        predicate: row.get("predicate")?,
        object: row.get("object")?,
        source: row.get("source")?,
        actor: row.get("actor")?,
        confidence: row.get("confidence")?,
        valid_from: row.get("valid_from")?,
        valid_to: row.get("valid_to")?,
        status: row.get("status")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn triple_snapshot(triple: &Triple) -> Value {
    serde_json::to_value(triple).unwrap_or(Value::Null)
}

fn insert_triple(conn: &Connection, new: &NewTriple) -> Result<Triple> {
    let id = new_id();
    let ts = now();
    conn.execute(
        "INSERT INTO triples (id, subject, predicate, object, source, actor, confidence, \
         valid_from, valid_to, status, created_at, updated_at, deleted_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, 'active', ?8, ?8, NULL)",
        params![
            id,
            new.subject,
            new.predicate,
            new.object,
            new.source,
            new.actor,
            new.confidence,
            ts,
        ],
    )?;
    get_triple_tx(conn, &id)
}

impl Database {
    pub fn create_triple(&self, new: NewTriple) -> Result<Triple> {
        validate_new(&new)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let triple = insert_triple(&tx, &new)?;

        super::transactions::log_transaction(
            &tx,
            crate::models::TransactionOp::Create,
            crate::models::EntityKind::Triple,
            &triple.id,
            None,
            Some(&triple_snapshot(&triple)),
        )?;

        tx.commit()?;
        Ok(triple)
    }

    /// Atomically find the active triple for `(subject, predicate)` and
    /// either update its object in place or insert a new triple. Exact
    /// subject/predicate match only — no fuzzy resolution at this layer.
    pub fn upsert_triple(&self, new: NewTriple) -> Result<Triple> {
        validate_new(&new)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: Option<Triple> = tx
            .query_row(
                "SELECT * FROM triples WHERE subject = ?1 AND predicate = ?2 \
                 AND deleted_at IS NULL",
                params![new.subject, new.predicate],
                row_to_triple,
            )
            .optional()?;

        let triple = match existing {
            Some(before) => {
                let mut after = before.clone();
                after.object = new.object.clone();
                after.source = new.source.clone();
                after.actor = new.actor.clone();
                after.confidence = new.confidence;
                after.updated_at = now();

                tx.execute(
                    "UPDATE triples SET object = ?1, source = ?2, actor = ?3, confidence = ?4, \
                     updated_at = ?5 WHERE id = ?6",
                    params![
                        after.object,
                        after.source,
                        after.actor,
                        after.confidence,
                        after.updated_at,
                        after.id,
                    ],
                )?;

                super::transactions::log_transaction(
                    &tx,
                    crate::models::TransactionOp::Update,
                    crate::models::EntityKind::Triple,
                    &after.id,
                    Some(&triple_snapshot(&before)),
                    Some(&triple_snapshot(&after)),
                )?;

                after
            }
            None => {
                let triple = insert_triple(&tx, &new)?;
                super::transactions::log_transaction(
                    &tx,
                    crate::models::TransactionOp::Create,
                    crate::models::EntityKind::Triple,
                    &triple.id,
                    None,
                    Some(&triple_snapshot(&triple)),
                )?;
                triple
            }
        };

        tx.commit()?;
        Ok(triple)
    }

    pub fn get_triple(&self, id: &str) -> Result<Triple> {
        let conn = self.conn()?;
        get_triple_tx(&conn, id)
    }

    pub fn update_triple(&self, id: &str, update: TripleUpdate) -> Result<Triple> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let before = get_triple_tx(&tx, id)?;
        let mut after = before.clone();

        if let Some(predicate) = update.predicate {
            if predicate.trim().is_empty() {
                return Err(Error::Validation("predicate must not be empty".into()));
            }
            after.predicate = predicate;
        }
        if let Some(object) = update.object {
            if object.trim().is_empty() {
                return Err(Error::Validation("object must not be empty".into()));
            }
            after.object = object;
        }
        if let Some(source) = update.source {
            after.source = source;
        }
        if let Some(actor) = update.actor {
            after.actor = actor;
        }
        if let Some(confidence) = update.confidence {
            if let Some(c) = confidence {
                if !(0.0..=1.0).contains(&c) {
                    return Err(Error::Validation("confidence must be in [0, 1]".into()));
                }
            }
            after.confidence = confidence;
        }
        after.updated_at = now();

        tx.execute(
            "UPDATE triples SET predicate = ?1, object = ?2, source = ?3, actor = ?4, \
             confidence = ?5, updated_at = ?6 WHERE id = ?7",
            params![
                after.predicate,
                after.object,
                after.source,
                after.actor,
                after.confidence,
                after.updated_at,
                id,
            ],
        )?;

        super::transactions::log_transaction(
            &tx,
            crate::models::TransactionOp::Update,
            crate::models::EntityKind::Triple,
            id,
            Some(&triple_snapshot(&before)),
            Some(&triple_snapshot(&after)),
        )?;

        tx.commit()?;
        Ok(after)
    }

    pub fn delete_triple(&self, id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let before = get_triple_tx(&tx, id)?;
        let ts = now();
        tx.execute(
            "UPDATE triples SET deleted_at = ?1 WHERE id = ?2",
            params![ts, id],
        )?;

        super::transactions::log_transaction(
            &tx,
            crate::models::TransactionOp::Delete,
            crate::models::EntityKind::Triple,
            id,
            Some(&triple_snapshot(&before)),
            None,
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn query_triples(&self, filter: TripleFilter) -> Result<Vec<Triple>> {
        let conn = self.conn()?;
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .clamp(1, MAX_QUERY_LIMIT);

        let mut clauses = vec!["deleted_at IS NULL".to_string()];
        let mut bind: Vec<String> = Vec::new();

        if let Some(subject) = &filter.subject {
            clauses.push(format!("subject LIKE ?{} ESCAPE '\\'", bind.len() + 1));
            bind.push(format!("%{}%", escape_like(subject)));
        }
        if let Some(predicate) = &filter.predicate {
            clauses.push(format!("predicate LIKE ?{} ESCAPE '\\'", bind.len() + 1));
            bind.push(format!("%{}%", escape_like(predicate)));
        }
        if let Some(object) = &filter.object {
            clauses.push(format!("object LIKE ?{} ESCAPE '\\'", bind.len() + 1));
            bind.push(format!("%{}%", escape_like(object)));
        }

        let sql = format!(
            "SELECT * FROM triples WHERE {} ORDER BY created_at DESC LIMIT {}",
            clauses.join(" AND "),
            limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            bind.iter().map(|b| b as &dyn rusqlite::ToSql).collect();
        let rows: Vec<Triple> = stmt
            .query_map(params_refs.as_slice(), row_to_triple)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Page through active triples ordered by id descending, for the
    /// `triples` read resource.
    pub fn list_triples(&self, limit: i64, after_id: Option<&str>) -> Result<Vec<Triple>> {
        let conn = self.conn()?;
        let rows: Vec<Triple> = match after_id {
            Some(after) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM triples WHERE deleted_at IS NULL AND id < ?1 \
                     ORDER BY id DESC LIMIT ?2",
                )?;
                stmt.query_map(params![after, limit], row_to_triple)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM triples WHERE deleted_at IS NULL ORDER BY id DESC LIMIT ?1",
                )?;
                stmt.query_map(params![limit], row_to_triple)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// All active triples exactly matching `(subject, predicate)`, for the
    /// conflict detector's scoped lookup.
    pub fn triples_with_subject_predicate(
        &self,
        subject: &str,
        predicate: &str,
    ) -> Result<Vec<Triple>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM triples WHERE deleted_at IS NULL \
             AND subject = ?1 AND predicate = ?2",
        )?;
        let rows: Vec<Triple> = stmt
            .query_map(params![subject, predicate], row_to_triple)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// All active triples naming `entity` as subject or object, for
    /// single-hop graph neighborhood lookups.
    pub fn triples_touching(&self, entity: &str) -> Result<Vec<Triple>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM triples WHERE deleted_at IS NULL \
             AND (subject = ?1 OR object = ?1)",
        )?;
        let rows: Vec<Triple> = stmt
            .query_map(params![entity], row_to_triple)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn get_triple_tx(conn: &Connection, id: &str) -> Result<Triple> {
    conn.query_row(
        "SELECT * FROM triples WHERE id = ?1 AND deleted_at IS NULL",
        params![id],
        row_to_triple,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("triple {id} not found")))
}

/// Restore a triple to the state captured in `before`. Used by the undo
/// engine to invert an UPDATE (including an upsert-as-update).
pub(super) fn restore_snapshot(conn: &Connection, id: &str, before: &Value) -> Result<()> {
    let triple: Triple = serde_json::from_value(before.clone())
        .map_err(|e| Error::Internal(format!("malformed triple snapshot: {e}")))?;
    conn.execute(
        "UPDATE triples SET subject = ?1, predicate = ?2, object = ?3, source = ?4, actor = ?5, \
         confidence = ?6, updated_at = ?7 WHERE id = ?8",
        params![
            triple.subject,
            triple.predicate,
            triple.object,
            triple.source,
            triple.actor,
            triple.confidence,
            triple.updated_at,
            id,
        ],
    )?;
    Ok(())
}

/// Rewrite every active triple's subject/object reference from `from` to
/// `to`, returning the ids of triples touched as subject and as object
/// respectively. Used by entity merge.
pub(super) fn reassign_entity_references(
    conn: &Connection,
    from: &str,
    to: &str,
) -> Result<(Vec<String>, Vec<String>)> {
    let mut subj_stmt = conn.prepare("SELECT id FROM triples WHERE subject = ?1")?;
    let subj_ids: Vec<String> = subj_stmt
        .query_map(params![from], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut obj_stmt = conn.prepare("SELECT id FROM triples WHERE object = ?1")?;
    let obj_ids: Vec<String> = obj_stmt
        .query_map(params![from], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    conn.execute(
        "UPDATE triples SET subject = ?1 WHERE subject = ?2",
        params![to, from],
    )?;
    conn.execute(
        "UPDATE triples SET object = ?1 WHERE object = ?2",
        params![to, from],
    )?;

    Ok((subj_ids, obj_ids))
}

/// Inverse of `reassign_entity_references`, used when reverting a merge:
/// points the given triple ids' subject/object back at `original`.
pub(super) fn restore_entity_references(
    conn: &Connection,
    subj_ids: &[String],
    obj_ids: &[String],
    original: &str,
) -> Result<()> {
    for id in subj_ids {
        conn.execute(
            "UPDATE triples SET subject = ?1 WHERE id = ?2",
            params![original, id],
        )?;
    }
    for id in obj_ids {
        conn.execute(
            "UPDATE triples SET object = ?1 WHERE id = ?2",
            params![original, id],
        )?;
    }
    Ok(())
}
