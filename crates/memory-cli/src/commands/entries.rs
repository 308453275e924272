//! Entry commands: store, update, query, delete

use anyhow::{bail, Result};
use memory_core::{DeletableKind, Engine, EntryFilter, EntryUpdate, NewEntry};

use super::{parse_tags, print_json};

#[allow(clippy::too_many_arguments)]
pub async fn cmd_store(
    engine: &Engine,
    topic: String,
    content: String,
    tags: Option<&str>,
    source: Option<String>,
    actor: Option<String>,
    confidence: Option<f64>,
) -> Result<()> {
    let result = engine
        .store(NewEntry {
            topic,
            content,
            tags: parse_tags(tags),
            source,
            actor,
            confidence,
            valid_from: None,
            valid_to: None,
        })
        .await?;
    print_json(&result)
}

pub async fn cmd_update(
    engine: &Engine,
    id: &str,
    topic: Option<String>,
    content: Option<String>,
    tags: Option<&str>,
) -> Result<()> {
    let update = EntryUpdate {
        topic,
        content,
        tags: tags.map(|t| parse_tags(Some(t))),
        source: None,
        actor: None,
        confidence: None,
    };
    let entry = engine.update(id, update).await?;
    print_json(&entry)
}

pub fn cmd_query(
    engine: &Engine,
    topic: Option<String>,
    content: Option<String>,
    tags: Option<&str>,
    limit: i64,
) -> Result<()> {
    let entries = engine.query(EntryFilter {
        topic,
        content,
        tags: parse_tags(tags),
        limit: Some(limit),
    })?;
    print_json(&entries)
}

pub async fn cmd_delete(engine: &Engine, id: &str, kind: &str) -> Result<()> {
    let kind = match kind {
        "entry" => DeletableKind::Entry,
        "triple" => DeletableKind::Triple,
        other => bail!("unknown delete kind `{other}`, expected `entry` or `triple`"),
    };
    let result = engine.delete(id, kind).await?;
    print_json(&result)
}
