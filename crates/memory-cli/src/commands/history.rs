//! Undo log commands: undo, history

use anyhow::{Context, Result};
use memory_core::{Engine, EntityKind};

use super::print_json;

pub fn cmd_undo(engine: &Engine, count: i64) -> Result<()> {
    let result = engine.undo(count)?;
    print_json(&result)
}

pub fn cmd_history(
    engine: &Engine,
    limit: i64,
    entity_type: Option<&str>,
    cursor: Option<&str>,
) -> Result<()> {
    let entity_type = entity_type
        .map(|s| s.parse::<EntityKind>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid --entity-type")?;
    let page = engine.history(Some(limit), entity_type, cursor)?;
    print_json(&page)
}
