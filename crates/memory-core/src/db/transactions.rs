//! Transaction log append and undo engine

use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::id::{new_id, now};
use crate::models::{EntityKind, Transaction, TransactionOp};

use super::Database;

/// Append one transaction row within an already-open `rusqlite::Connection`
/// transaction. Every mutation emits exactly one of these in the same
/// atomic batch as the row it describes.
pub(super) fn log_transaction(
    conn: &Connection,
    op: TransactionOp,
    entity_type: EntityKind,
    entity_id: &str,
    before: Option<&Value>,
    after: Option<&Value>,
) -> Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO transactions (id, op, entity_type, entity_id, before_snapshot, after_snapshot, reverted_by, created_at)
         VALUES (?, ?, ?, ?, ?, ?, NULL, ?)",
        params![
            id,
            op.as_str(),
            entity_type.as_str(),
            entity_id,
            before.map(|v| v.to_string()),
            after.map(|v| v.to_string()),
            now(),
        ],
    )?;
    Ok(id)
}

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let op: String = row.get("op")?;
    let entity_type: String = row.get("entity_type")?;
    let before: Option<String> = row.get("before_snapshot")?;
    let after: Option<String> = row.get("after_snapshot")?;

    Ok(Transaction {
        id: row.get("id")?,
        op: op.parse().unwrap_or(TransactionOp::Revert),
        entity_type: entity_type.parse().unwrap_or(EntityKind::Entry),
        entity_id: row.get("entity_id")?,
        before_snapshot: before.and_then(|s| serde_json::from_str(&s).ok()),
        after_snapshot: after.and_then(|s| serde_json::from_str(&s).ok()),
        reverted_by: row.get("reverted_by")?,
        created_at: row.get("created_at")?,
    })
}

/// Result of an `undo(n)` call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UndoResult {
    pub reverted: Vec<String>,
}

impl Database {
    /// Paginated transaction history, optionally filtered by entity type,
    /// newest first. Ordered and cursor-paginated by id alone: ids are
    /// lexically sortable in minting order (see `id::new_id`), so `id DESC`
    /// is equivalent to `created_at DESC` with a deterministic tie-break,
    /// and the same `id < after` cursor shape as the `transactions` read
    /// resource applies here too.
    pub fn history(
        &self,
        limit: i64,
        entity_type: Option<EntityKind>,
        after_id: Option<&str>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let limit = limit.clamp(1, crate::models::MAX_QUERY_LIMIT);

        let rows = match (entity_type, after_id) {
            (Some(kind), Some(after)) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM transactions WHERE entity_type = ?1 AND id < ?2 \
                     ORDER BY id DESC LIMIT ?3",
                )?;
                stmt.query_map(params![kind.as_str(), after, limit], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            (Some(kind), None) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM transactions WHERE entity_type = ?1 \
                     ORDER BY id DESC LIMIT ?2",
                )?;
                stmt.query_map(params![kind.as_str(), limit], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            (None, Some(after)) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM transactions WHERE id < ?1 ORDER BY id DESC LIMIT ?2",
                )?;
                stmt.query_map(params![after, limit], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            (None, None) => {
                let mut stmt =
                    conn.prepare("SELECT * FROM transactions ORDER BY id DESC LIMIT ?1")?;
                stmt.query_map(params![limit], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// Page through the transaction log ordered by id descending, for the
    /// `transactions` read resource.
    pub fn list_transactions(&self, limit: i64, after_id: Option<&str>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let rows: Vec<Transaction> = match after_id {
            Some(after) => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM transactions WHERE id < ?1 ORDER BY id DESC LIMIT ?2",
                )?;
                stmt.query_map(params![after, limit], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare("SELECT * FROM transactions ORDER BY id DESC LIMIT ?1")?;
                stmt.query_map(params![limit], row_to_transaction)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    /// Undo the `n` most recent non-revert, not-yet-reverted transactions,
    /// ordered by `(created_at desc, id desc)` for deterministic
    /// tie-breaking. Each is processed in its own atomic batch: the
    /// inverse mutation is applied, a REVERT transaction with swapped
    /// snapshots is appended, and the original row's `reverted_by` is
    /// stamped. Idempotent: a transaction already stamped `reverted_by`
    /// is never selected again.
    pub fn undo(&self, n: i64) -> Result<UndoResult> {
        let mut conn = self.conn()?;
        let candidates: Vec<Transaction> = {
            let mut stmt = conn.prepare(
                "SELECT * FROM transactions \
                 WHERE op != 'REVERT' AND reverted_by IS NULL \
                 ORDER BY created_at DESC, id DESC LIMIT ?1",
            )?;
            stmt.query_map(params![n], row_to_transaction)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut reverted = Vec::with_capacity(candidates.len());
        for tx in candidates {
            let tx_db = conn.transaction()?;
            revert_one(&tx_db, &tx)?;
            tx_db.commit()?;
            reverted.push(tx.id.clone());
            info!(transaction_id = %tx.id, op = tx.op.as_str(), "undone");
        }

        Ok(UndoResult { reverted })
    }
}

fn revert_one(conn: &Connection, tx: &Transaction) -> Result<()> {
    match tx.op {
        TransactionOp::Create => match tx.entity_type {
            EntityKind::Entity | EntityKind::Alias => {
                super::entities::revert_create(conn, tx.entity_type, &tx.entity_id)?;
            }
            _ => {
                set_deleted_at(conn, tx.entity_type, &tx.entity_id, Some(now().as_str()))?;
            }
        },
        TransactionOp::Delete => {
            set_deleted_at(conn, tx.entity_type, &tx.entity_id, None)?;
        }
        TransactionOp::Update => {
            let before = tx
                .before_snapshot
                .as_ref()
                .ok_or_else(|| Error::Internal("UPDATE transaction missing before_snapshot".into()))?;
            restore_update(conn, tx.entity_type, &tx.entity_id, before)?;
        }
        TransactionOp::Merge => {
            let before = tx
                .before_snapshot
                .as_ref()
                .ok_or_else(|| Error::Internal("MERGE transaction missing before_snapshot".into()))?;
            super::entities::revert_merge(conn, before)?;
        }
        // Undo of unknown/revert operation kinds is a no-op beyond
        // recording the REVERT row below.
        TransactionOp::Revert => {}
    }

    let revert_id = log_transaction(
        conn,
        TransactionOp::Revert,
        tx.entity_type,
        &tx.entity_id,
        tx.after_snapshot.as_ref(),
        tx.before_snapshot.as_ref(),
    )?;

    conn.execute(
        "UPDATE transactions SET reverted_by = ?1 WHERE id = ?2",
        params![revert_id, tx.id],
    )?;

    Ok(())
}

fn set_deleted_at(
    conn: &Connection,
    entity_type: EntityKind,
    entity_id: &str,
    deleted_at: Option<&str>,
) -> Result<()> {
    let table = match entity_type {
        EntityKind::Entry => "entries",
        EntityKind::Triple => "triples",
        other => {
            return Err(Error::Internal(format!(
                "entity kind {other:?} has no soft-delete column"
            )))
        }
    };
    conn.execute(
        &format!("UPDATE {table} SET deleted_at = ?1 WHERE id = ?2"),
        params![deleted_at, entity_id],
    )?;
    Ok(())
}

fn restore_update(
    conn: &Connection,
    entity_type: EntityKind,
    entity_id: &str,
    before: &Value,
) -> Result<()> {
    match entity_type {
        EntityKind::Entry => super::entries::restore_snapshot(conn, entity_id, before),
        EntityKind::Triple => super::triples::restore_snapshot(conn, entity_id, before),
        other => Err(Error::Internal(format!(
            "entity kind {other:?} has no UPDATE restoration path"
        ))),
    }
}

