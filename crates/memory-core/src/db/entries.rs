//! Entry CRUD, provenance, and lexical index maintenance

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::id::{new_id, now};
use crate::models::{
    Entry, EntryFilter, EntryUpdate, NewEntry, CONTENT_MAX_LEN, DEFAULT_QUERY_LIMIT,
    MAX_QUERY_LIMIT, TOPIC_MAX_LEN,
};

use super::{escape_like, Database};

fn validate_new(new: &NewEntry) -> Result<()> {
    if new.topic.trim().is_empty() {
        return Err(Error::Validation("topic must not be empty".into()));
    }
    if new.topic.len() > TOPIC_MAX_LEN {
        return Err(Error::Validation(format!(
            "topic exceeds {TOPIC_MAX_LEN} characters"
        )));
    }
    if new.content.len() > CONTENT_MAX_LEN {
        return Err(Error::Validation(format!(
            "content exceeds {CONTENT_MAX_LEN} characters"
        )));
    }
    if let Some(c) = new.confidence {
        if !(0.0..=1.0).contains(&c) {
            return Err(Error::Validation("confidence must be in [0, 1]".into()));
        }
    }
    Ok(())
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<Entry> {
    let tags: String = row.get("tags")?;
    Ok(Entry {
        id: row.get("id")?,
        topic: row.get("topic")?,
        content: row.get("content")?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        source: row.get("source")?,
        actor: row.get("actor")?,
        confidence: row.get("confidence")?,
        valid_from: row.get("valid_from")?,
        valid_to: row.get("valid_to")?,
        status: row.get("status")?,
        canonical_entity_id: row.get("canonical_entity_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn entry_snapshot(entry: &Entry) -> Value {
    serde_json::to_value(entry).unwrap_or(Value::Null)
}

impl Database {
    pub fn create_entry(&self, new: NewEntry) -> Result<Entry> {
        validate_new(&new)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let id = new_id();
        let ts = now();
        let tags = serde_json::to_string(&new.tags)?;

        tx.execute(
            "INSERT INTO entries (id, topic, content, tags, source, actor, confidence, \
             valid_from, valid_to, status, canonical_entity_id, created_at, updated_at, deleted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'active', NULL, ?10, ?10, NULL)",
            params![
                id,
                new.topic,
                new.content,
                tags,
                new.source,
                new.actor,
                new.confidence,
                new.valid_from,
                new.valid_to,
                ts,
            ],
        )?;

        let entry = get_entry_tx(&tx, &id)?;
        super::transactions::log_transaction(
            &tx,
            crate::models::TransactionOp::Create,
            crate::models::EntityKind::Entry,
            &id,
            None,
            Some(&entry_snapshot(&entry)),
        )?;

        tx.commit()?;
        Ok(entry)
    }

    pub fn get_entry(&self, id: &str) -> Result<Entry> {
        let conn = self.conn()?;
        get_entry_tx(&conn, id)
    }

    pub fn update_entry(&self, id: &str, update: EntryUpdate) -> Result<Entry> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let before = get_entry_tx(&tx, id)?;
        let mut after = before.clone();

        if let Some(topic) = update.topic {
            if topic.trim().is_empty() {
                return Err(Error::Validation("topic must not be empty".into()));
            }
            after.topic = topic;
        }
        if let Some(content) = update.content {
            after.content = content;
        }
        if let Some(tags) = update.tags {
            after.tags = tags;
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

        let tags_json = serde_json::to_string(&after.tags)?;
        tx.execute(
            "UPDATE entries SET topic = ?1, content = ?2, tags = ?3, source = ?4, actor = ?5, \
             confidence = ?6, updated_at = ?7 WHERE id = ?8",
            params![
                after.topic,
                after.content,
                tags_json,
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
            crate::models::EntityKind::Entry,
            id,
            Some(&entry_snapshot(&before)),
            Some(&entry_snapshot(&after)),
        )?;

        tx.commit()?;
        Ok(after)
    }

    pub fn delete_entry(&self, id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let before = get_entry_tx(&tx, id)?;
        let ts = now();
        tx.execute(
            "UPDATE entries SET deleted_at = ?1 WHERE id = ?2",
            params![ts, id],
        )?;

        super::transactions::log_transaction(
            &tx,
            crate::models::TransactionOp::Delete,
            crate::models::EntityKind::Entry,
            id,
            Some(&entry_snapshot(&before)),
            None,
        )?;

        tx.commit()?;
        Ok(())
    }

    pub fn query_entries(&self, filter: EntryFilter) -> Result<Vec<Entry>> {
        let conn = self.conn()?;
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .clamp(1, MAX_QUERY_LIMIT);

        let mut clauses = vec!["deleted_at IS NULL".to_string()];
        let mut bind: Vec<String> = Vec::new();

        if let Some(topic) = &filter.topic {
            clauses.push(format!("topic LIKE ?{} ESCAPE '\\'", bind.len() + 1));
            bind.push(format!("%{}%", escape_like(topic)));
        }
        if let Some(content) = &filter.content {
            clauses.push(format!("content LIKE ?{} ESCAPE '\\'", bind.len() + 1));
            bind.push(format!("%{}%", escape_like(content)));
        }

        let sql = format!("SELECT * FROM entries WHERE {}", clauses.join(" AND "));
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            bind.iter().map(|b| b as &dyn rusqlite::ToSql).collect();
        let rows: Vec<Entry> = stmt
            .query_map(params_refs.as_slice(), row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        // Tag filtering happens in-process: tags are stored as a JSON array
        // column, and the filter requires "all of" semantics which SQLite's
        // LIKE can't express cleanly over a serialized set.
        let filtered: Vec<Entry> = if filter.tags.is_empty() {
            rows
        } else {
            rows.into_iter()
                .filter(|e| filter.tags.is_subset(&e.tags))
                .collect()
        };

        Ok(filtered.into_iter().take(limit as usize).collect())
    }

    /// Active entries whose topic exactly matches `topic`, for the graph
    /// scorer's neighbor lookup.
    pub fn entries_with_exact_topic(&self, topic: &str) -> Result<Vec<Entry>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM entries WHERE deleted_at IS NULL AND topic = ?1")?;
        let rows: Vec<Entry> = stmt
            .query_map(params![topic], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Page through active entries ordered by id descending, for the
    /// `entries` read resource. `after_id`, when given, resumes strictly
    /// after that id (exclusive).
    pub fn list_entries(&self, limit: i64, after_id: Option<&str>) -> Result<Vec<Entry>> {
        let conn = self.conn()?;
        let rows: Vec<Entry> = match after_id {
            Some(after) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM entries WHERE deleted_at IS NULL AND id < ?1 \
                     ORDER BY id DESC LIMIT ?2",
                )?;
                stmt.query_map(params![after, limit], row_to_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM entries WHERE deleted_at IS NULL ORDER BY id DESC LIMIT ?1",
                )?;
                stmt.query_map(params![limit], row_to_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// The first active entry whose content matches `content` exactly, used
    /// by ingestion to skip chunks that duplicate existing knowledge.
    pub fn find_entry_by_exact_content(&self, content: &str) -> Result<Option<Entry>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT * FROM entries WHERE deleted_at IS NULL AND content = ?1 LIMIT 1",
            params![content],
            row_to_entry,
        )
        .optional()
        .map_err(Error::from)
    }
}

fn get_entry_tx(conn: &Connection, id: &str) -> Result<Entry> {
    conn.query_row(
        "SELECT * FROM entries WHERE id = ?1 AND deleted_at IS NULL",
        params![id],
        row_to_entry,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("entry {id} not found")))
}

/// Restore an entry to the state captured in `before` (a `Entry` snapshot
/// as produced by `entry_snapshot`). Used by the undo engine to invert an
/// UPDATE.
pub(super) fn restore_snapshot(conn: &Connection, id: &str, before: &Value) -> Result<()> {
    let entry: Entry = serde_json::from_value(before.clone())
        .map_err(|e| Error::Internal(format!("malformed entry snapshot: {e}")))?;
    let tags = serde_json::to_string(&entry.tags)?;
    conn.execute(
        "UPDATE entries SET topic = ?1, content = ?2, tags = ?3, source = ?4, actor = ?5, \
         confidence = ?6, updated_at = ?7 WHERE id = ?8",
        params![
            entry.topic,
            entry.content,
            tags,
            entry.source,
            entry.actor,
            entry.confidence,
            entry.updated_at,
            id,
        ],
    )?;
    Ok(())
}

/// Reassign all entries currently pointing at `from` to point at `to`,
/// returning the affected entry ids. Used by entity merge.
pub(super) fn reassign_canonical_entity(
    conn: &Connection,
    from: &str,
    to: &str,
) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM entries WHERE canonical_entity_id = ?1")?;
    let ids: Vec<String> = stmt
        .query_map(params![from], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    conn.execute(
        "UPDATE entries SET canonical_entity_id = ?1 WHERE canonical_entity_id = ?2",
        params![to, from],
    )?;

    Ok(ids)
}
