//! Asynchronous ingestion batcher: chunk free text into entries
//!
//! Small inputs are ingested synchronously in one call. Larger inputs
//! are split across resumable batches of up to 10 chunks, driven by an
//! external scheduler that re-enqueues itself while work remains.

mod chunking;

use std::sync::Arc;

use crate::collaborators::ChangeNotifier;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{IngestionStatus, IngestionTask, NewEntry};

const SYNC_CONTENT_LIMIT: usize = 5_000;
const SYNC_CHUNK_LIMIT: usize = 20;
const ASYNC_INLINE_LIMIT: usize = 900_000;
const BATCH_SIZE: i64 = 10;
const DEFAULT_TOPIC: &str = "ingested";
const TOPIC_MAX_LEN: usize = 100;

/// Outcome of a synchronous ingestion.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncIngestResult {
    pub task_id: String,
    pub entries_created: i64,
    pub duplicates_skipped: i64,
}

/// Outcome of processing one async batch.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IngestionBatch {
    pub task_id: String,
    pub entries_created: i64,
    pub duplicates_skipped: i64,
    /// Chunks still unprocessed after this batch. The scheduler
    /// re-enqueues itself with a short delay whenever this is nonzero.
    pub remaining: i64,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct InlinePayload {
    content: String,
    source: Option<String>,
}

/// Ingest `content`, choosing the synchronous path when it fits within
/// `SYNC_CONTENT_LIMIT` chars and `SYNC_CHUNK_LIMIT` chunks, otherwise
/// creating a pending task for `process_batch` to drive.
pub async fn ingest(
    db: &Database,
    content: &str,
    source: Option<String>,
    notifier: &(dyn ChangeNotifier),
) -> Result<SyncIngestResult> {
    let chunks = chunking::chunk(content);

    if content.len() <= SYNC_CONTENT_LIMIT && chunks.len() <= SYNC_CHUNK_LIMIT {
        ingest_sync(db, &chunks, source, notifier).await
    } else {
        if content.len() > ASYNC_INLINE_LIMIT {
            return Err(Error::Validation(format!(
                "content exceeds the {ASYNC_INLINE_LIMIT} byte inline ingestion cap; pre-chunk before calling ingest"
            )));
        }
        let payload = InlinePayload {
            content: content.to_string(),
            source,
        };
        let input_uri = serde_json::to_string(&payload)?;
        let task = db.create_ingestion_task(IngestionStatus::Pending, &input_uri, chunks.len() as i64)?;
        Ok(SyncIngestResult {
            task_id: task.id,
            entries_created: 0,
            duplicates_skipped: 0,
        })
    }
}

async fn ingest_sync(
    db: &Database,
    chunks: &[String],
    source: Option<String>,
    notifier: &(dyn ChangeNotifier),
) -> Result<SyncIngestResult> {
    let task = db.create_ingestion_task(IngestionStatus::Processing, "inline:sync", chunks.len() as i64)?;

    let mut entries_created = 0;
    let mut duplicates_skipped = 0;
    let mut touched = Vec::new();

    for (i, chunk) in chunks.iter().enumerate() {
        match ingest_one_chunk(db, chunk, source.as_deref(), &task.id)? {
            Some(entry_id) => {
                entries_created += 1;
                touched.push(format!("entry:{entry_id}"));
            }
            None => duplicates_skipped += 1,
        }
        db.advance_ingestion_task(&task.id, i as i64 + 1)?;
    }

    db.complete_ingestion_task(&task.id)?;
    if !touched.is_empty() {
        notifier.notify(&touched).await;
    }

    Ok(SyncIngestResult {
        task_id: task.id,
        entries_created,
        duplicates_skipped,
    })
}

/// Process up to `BATCH_SIZE` chunks of a pending/processing task,
/// resuming from `processed_items`. Returns the batch outcome including
/// `remaining`, which the caller's scheduler uses to decide whether to
/// re-enqueue itself.
pub async fn process_batch(
    db: &Database,
    task_id: &str,
    notifier: &(dyn ChangeNotifier),
) -> Result<IngestionBatch> {
    let task = db.get_ingestion_task(task_id)?;

    let payload: InlinePayload = match serde_json::from_str(&task.input_uri) {
        Ok(p) => p,
        Err(e) => {
            let message = format!("unparseable ingestion input: {e}");
            db.fail_ingestion_task(task_id, &message)?;
            return Err(Error::Validation(message));
        }
    };

    if task.status == IngestionStatus::Pending {
        db.set_ingestion_processing(task_id)?;
    }

    let chunks = chunking::chunk(&payload.content);
    let start = task.processed_items as usize;
    let end = (start + BATCH_SIZE as usize).min(chunks.len());

    let mut entries_created = 0;
    let mut duplicates_skipped = 0;
    let mut touched = Vec::new();

    for i in start..end {
        match ingest_one_chunk(db, &chunks[i], payload.source.as_deref(), task_id)? {
            Some(entry_id) => {
                entries_created += 1;
                touched.push(format!("entry:{entry_id}"));
            }
            None => duplicates_skipped += 1,
        }
        db.advance_ingestion_task(task_id, i as i64 + 1)?;
    }

    let remaining = (chunks.len() - end) as i64;
    if remaining == 0 {
        db.complete_ingestion_task(task_id)?;
    }
    if !touched.is_empty() {
        notifier.notify(&touched).await;
    }

    Ok(IngestionBatch {
        task_id: task_id.to_string(),
        entries_created,
        duplicates_skipped,
        remaining,
    })
}

/// Returns `Some(entry_id)` if a new entry was created, `None` if the
/// chunk's content exactly matched an existing active entry and was
/// skipped.
fn ingest_one_chunk(
    db: &Database,
    chunk: &str,
    source: Option<&str>,
    task_id: &str,
) -> Result<Option<String>> {
    if db.find_entry_by_exact_content(chunk)?.is_some() {
        return Ok(None);
    }

    let topic = chunk
        .lines()
        .next()
        .map(|line| truncate(line.trim(), TOPIC_MAX_LEN))
        .filter(|line| !line.is_empty())
        .unwrap_or_else(|| DEFAULT_TOPIC.to_string());

    let entry = db.create_entry(NewEntry {
        topic,
        content: chunk.to_string(),
        tags: ["ingested".to_string()].into_iter().collect(),
        source: Some(
            source
                .map(str::to_string)
                .unwrap_or_else(|| format!("ingestion:{task_id}")),
        ),
        actor: None,
        confidence: None,
        valid_from: None,
        valid_to: None,
    })?;

    Ok(Some(entry.id))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Marker type kept for callers that want to move a notifier around as
/// a trait object without naming the concrete collaborator.
pub type SharedNotifier = Arc<dyn ChangeNotifier>;

/// Expose the ingestion task row for status polling.
pub fn task_status(db: &Database, task_id: &str) -> Result<IngestionTask> {
    db.get_ingestion_task(task_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::NoopChangeNotifier;

    #[tokio::test]
    async fn small_content_ingests_synchronously() {
        let db = Database::in_memory().expect("db");
        let notifier = NoopChangeNotifier;
        let result = ingest(&db, "hello world\n\n\nthis is a paragraph", None, &notifier)
            .await
            .expect("ingest");
        assert_eq!(result.entries_created, 2);
        assert_eq!(result.duplicates_skipped, 0);

        let task = task_status(&db, &result.task_id).expect("task");
        assert_eq!(task.status, IngestionStatus::Completed);
    }

    #[tokio::test]
    async fn duplicate_content_is_skipped() {
        let db = Database::in_memory().expect("db");
        let notifier = NoopChangeNotifier;
        ingest(&db, "same content", None, &notifier).await.expect("first");
        let second = ingest(&db, "same content", None, &notifier).await.expect("second");
        assert_eq!(second.entries_created, 0);
        assert_eq!(second.duplicates_skipped, 1);
    }

    #[tokio::test]
    async fn large_content_uses_async_path_and_resumes_in_batches() {
        let db = Database::in_memory().expect("db");
        let notifier = NoopChangeNotifier;

        // Each paragraph is padded past half the chunk-merge threshold so
        // no two of them concatenate into a shared chunk: 25 paragraphs
        // in, 25 chunks out.
        let mut paragraphs = Vec::new();
        for i in 0..25 {
            paragraphs.push(format!("paragraph number {i}: {}", "x".repeat(280)));
        }
        let content = paragraphs.join("\n\n\n");

        let result = ingest(&db, &content, None, &notifier).await.expect("ingest");
        let task = task_status(&db, &result.task_id).expect("task");
        assert_eq!(task.status, IngestionStatus::Pending);

        let first_batch = process_batch(&db, &result.task_id, &notifier)
            .await
            .expect("first batch");
        assert_eq!(first_batch.entries_created, 10);
        assert!(first_batch.remaining > 0);

        let second_batch = process_batch(&db, &result.task_id, &notifier)
            .await
            .expect("second batch");
        assert_eq!(second_batch.entries_created, 10);
        assert!(second_batch.remaining > 0);

        let third_batch = process_batch(&db, &result.task_id, &notifier)
            .await
            .expect("third batch");
        assert_eq!(third_batch.entries_created, 5);
        assert_eq!(third_batch.remaining, 0);

        let task = task_status(&db, &result.task_id).expect("task");
        assert_eq!(task.status, IngestionStatus::Completed);
    }
}
