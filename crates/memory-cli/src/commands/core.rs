//! Shared utilities: engine construction and output formatting

use std::path::Path;

use anyhow::{Context, Result};
use memory_core::{Database, Engine};

/// Open the database at `db_path` and wrap it in a default-configured
/// engine (no embedder, no vector index, no change notifier). Every
/// command opens its own engine; the CLI is a thin, stateless harness
/// over `memory-core`.
pub fn open_engine(db_path: &Path) -> Result<Engine> {
    let path = db_path
        .to_str()
        .context("database path must be valid UTF-8")?;
    let db = Database::open(path).with_context(|| format!("opening database at {path}"))?;
    Ok(Engine::new(db))
}

/// Pretty-print a value as JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

/// Split a comma-separated CLI flag into a trimmed, non-empty tag set.
pub fn parse_tags(raw: Option<&str>) -> std::collections::BTreeSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
    .unwrap_or_default()
}
