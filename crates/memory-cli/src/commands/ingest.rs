//! Ingestion commands: ingest, ingestion-status

use std::path::Path;

use anyhow::{bail, Context, Result};
use memory_core::{Engine, IngestOutcome};

use super::print_json;

pub async fn cmd_ingest(
    engine: &Engine,
    file: Option<&Path>,
    text: Option<String>,
    source: Option<String>,
    wait: bool,
) -> Result<()> {
    let content = match (file, text) {
        (Some(path), None) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        (None, Some(text)) => text,
        (None, None) => bail!("one of --file or --text is required"),
        (Some(_), Some(_)) => bail!("--file and --text are mutually exclusive"),
    };

    let outcome = engine.ingest(&content, source).await?;

    match outcome {
        IngestOutcome::Sync(result) => print_json(&result),
        IngestOutcome::Async { task_id } => {
            if wait {
                loop {
                    let batch = engine.ingest_batch(&task_id).await?;
                    if batch.remaining == 0 {
                        print_json(&batch)?;
                        break;
                    }
                }
                Ok(())
            } else {
                print_json(&serde_json::json!({ "task_id": task_id, "mode": "async" }))
            }
        }
    }
}

pub fn cmd_ingestion_status(engine: &Engine, task_id: &str) -> Result<()> {
    let task = engine.ingestion_status(task_id)?;
    print_json(&task)
}
