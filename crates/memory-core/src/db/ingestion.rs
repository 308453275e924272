//! Ingestion task bookkeeping: pending/processing/completed/failed rows

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::id::{new_id, now};
use crate::models::{IngestionStatus, IngestionTask};

use super::Database;

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<IngestionTask> {
    let status: String = row.get("status")?;
    Ok(IngestionTask {
        id: row.get("id")?,
        status: status.parse().unwrap_or(IngestionStatus::Failed),
        input_uri: row.get("input_uri")?,
        total_items: row.get("total_items")?,
        processed_items: row.get("processed_items")?,
        error: row.get("error")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl Database {
    pub fn create_ingestion_task(
        &self,
        status: IngestionStatus,
        input_uri: &str,
        total_items: i64,
    ) -> Result<IngestionTask> {
        let conn = self.conn()?;
        let id = new_id();
        let ts = now();
        conn.execute(
            "INSERT INTO ingestion_tasks (id, status, input_uri, total_items, processed_items, \
             error, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, ?5)",
            params![id, status.as_str(), input_uri, total_items, ts],
        )?;
        get_task(&conn, &id)
    }

    pub fn get_ingestion_task(&self, id: &str) -> Result<IngestionTask> {
        let conn = self.conn()?;
        get_task(&conn, id)
    }

    pub fn advance_ingestion_task(&self, id: &str, processed_items: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE ingestion_tasks SET processed_items = ?1, updated_at = ?2 WHERE id = ?3",
            params![processed_items, now(), id],
        )?;
        Ok(())
    }

    pub fn complete_ingestion_task(&self, id: &str) -> Result<()> {
        self.set_ingestion_status(id, IngestionStatus::Completed, None)
    }

    pub fn fail_ingestion_task(&self, id: &str, error: &str) -> Result<()> {
        self.set_ingestion_status(id, IngestionStatus::Failed, Some(error))
    }

    fn set_ingestion_status(
        &self,
        id: &str,
        status: IngestionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE ingestion_tasks SET status = ?1, error = ?2, updated_at = ?3 WHERE id = ?4",
            params![status.as_str(), error, now(), id],
        )?;
        Ok(())
    }

    pub fn set_ingestion_processing(&self, id: &str) -> Result<()> {
        self.set_ingestion_status(id, IngestionStatus::Processing, None)
    }
}

fn get_task(conn: &Connection, id: &str) -> Result<IngestionTask> {
    conn.query_row(
        "SELECT * FROM ingestion_tasks WHERE id = ?1",
        params![id],
        row_to_task,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("ingestion task {id} not found")))
}
