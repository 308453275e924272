//! Canonical entity commands: upsert-entity, merge-entities

use anyhow::Result;
use memory_core::Engine;

use super::print_json;

pub async fn cmd_upsert_entity(engine: &Engine, name: &str) -> Result<()> {
    let result = engine.upsert_entity(name).await?;
    print_json(&result)
}

pub async fn cmd_merge_entities(engine: &Engine, keep_id: &str, merge_id: &str) -> Result<()> {
    let result = engine.merge_entities(keep_id, merge_id).await?;
    print_json(&result)
}
