//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `entries` - Entry CRUD, provenance, lexical index
//! - `triples` - Triple CRUD and upsert
//! - `entities` - Canonical entity creation, aliasing, resolution, merge
//! - `ingestion` - Ingestion task bookkeeping
//! - `transactions` - Transaction log append and undo engine

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

mod entities;
mod entries;
mod ingestion;
mod transactions;
mod triples;

#[cfg(test)]
mod tests;

pub use entities::MergeOutcome;
pub use transactions::UndoResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Escape the three SQL `LIKE` wildcard metacharacters (`%`, `_`, and the
/// escape character itself) so that user-supplied substrings match
/// literally. Callers wrap the escaped string in their own `%...%`
/// pattern and pass `ESCAPE '\'` in the query.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == '\\' || c == '%' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Whether the embedded SQLite build supports FTS5. Detected once at
/// startup; both the FTS and substring-fallback code paths exist and the
/// retriever picks whichever this reports.
fn detect_fts5(conn: &Connection) -> bool {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS __fts5_probe USING fts5(x); \
         DROP TABLE __fts5_probe;",
    )
    .is_ok()
}

/// Database wrapper with connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Whether the embedded engine supports full-text search.
    fts_available: bool,
}

impl Database {
    /// Open (or create) a database file and run migrations.
    pub fn open(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        Self::from_manager(manager)
    }

    /// Create a fresh, uniquely-named temp-file-backed database for tests.
    ///
    /// Uses a temp file rather than `:memory:` so that the connection
    /// pool's multiple connections all see the same database (an
    /// in-memory SQLite database is private to the connection that
    /// created it).
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("memory_store_test_{id}.db"));
        let _ = std::fs::remove_file(&path);

        let manager = SqliteConnectionManager::file(path);
        Self::from_manager(manager)
    }

    fn from_manager(manager: SqliteConnectionManager) -> Result<Self> {
        let pool = Pool::builder().max_size(10).build(manager)?;
        let conn = pool.get()?;
        let fts_available = detect_fts5(&conn);
        run_migrations(&conn, fts_available)?;
        drop(conn);

        info!(fts_available, "database ready");
        Ok(Self {
            pool,
            fts_available,
        })
    }

    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Whether lexical search can use the native full-text index.
    pub fn fts_available(&self) -> bool {
        self.fts_available
    }
}

fn run_migrations(conn: &Connection, fts_available: bool) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            topic TEXT NOT NULL,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            source TEXT,
            actor TEXT,
            confidence REAL,
            valid_from TEXT,
            valid_to TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            canonical_entity_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_entries_created ON entries(created_at);
        CREATE INDEX IF NOT EXISTS idx_entries_deleted ON entries(deleted_at);
        CREATE INDEX IF NOT EXISTS idx_entries_canonical ON entries(canonical_entity_id);

        CREATE TABLE IF NOT EXISTS triples (
            id TEXT PRIMARY KEY,
            subject TEXT NOT NULL,
            predicate TEXT NOT NULL,
            object TEXT NOT NULL,
            source TEXT,
            actor TEXT,
            confidence REAL,
            valid_from TEXT,
            valid_to TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_triples_subject ON triples(subject);
        CREATE INDEX IF NOT EXISTS idx_triples_predicate ON triples(predicate);
        CREATE INDEX IF NOT EXISTS idx_triples_object ON triples(object);
        CREATE INDEX IF NOT EXISTS idx_triples_sp ON triples(subject, predicate);
        CREATE INDEX IF NOT EXISTS idx_triples_deleted ON triples(deleted_at);

        CREATE TABLE IF NOT EXISTS canonical_entities (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS entity_aliases (
            id TEXT PRIMARY KEY,
            alias TEXT NOT NULL,
            canonical_entity_id TEXT NOT NULL REFERENCES canonical_entities(id),
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_aliases_alias ON entity_aliases(alias);
        CREATE INDEX IF NOT EXISTS idx_aliases_entity ON entity_aliases(canonical_entity_id);

        CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            op TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            before_snapshot TEXT,
            after_snapshot TEXT,
            reverted_by TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions(created_at);
        CREATE INDEX IF NOT EXISTS idx_transactions_entity ON transactions(entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_reverted ON transactions(reverted_by);

        CREATE TABLE IF NOT EXISTS ingestion_tasks (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            input_uri TEXT NOT NULL,
            total_items INTEGER NOT NULL DEFAULT 0,
            processed_items INTEGER NOT NULL DEFAULT 0,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    if fts_available {
        conn.execute_batch(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
                id UNINDEXED,
                topic,
                content,
                tags,
                content=entries,
                content_rowid=rowid,
                tokenize='porter unicode61'
            );

            CREATE TRIGGER IF NOT EXISTS entries_fts_insert AFTER INSERT ON entries
            BEGIN
                INSERT INTO entries_fts(rowid, id, topic, content, tags)
                VALUES (NEW.rowid, NEW.id, NEW.topic, NEW.content, NEW.tags);
            END;

            CREATE TRIGGER IF NOT EXISTS entries_fts_delete AFTER DELETE ON entries
            BEGIN
                INSERT INTO entries_fts(entries_fts, rowid, id, topic, content, tags)
                VALUES ('delete', OLD.rowid, OLD.id, OLD.topic, OLD.content, OLD.tags);
            END;

            CREATE TRIGGER IF NOT EXISTS entries_fts_update AFTER UPDATE ON entries
            BEGIN
                INSERT INTO entries_fts(entries_fts, rowid, id, topic, content, tags)
                VALUES ('delete', OLD.rowid, OLD.id, OLD.topic, OLD.content, OLD.tags);
                INSERT INTO entries_fts(rowid, id, topic, content, tags)
                VALUES (NEW.rowid, NEW.id, NEW.topic, NEW.content, NEW.tags);
            END;
            "#,
        )?;
    }

    Ok(())
}
