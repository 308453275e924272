//! Triple commands: relate, query-graph, update-triple, upsert-triple, resolve-conflict

use anyhow::{bail, Result};
use memory_core::{ConflictResolution, Engine, NewTriple, TripleFilter, TripleUpdate};

use super::print_json;

pub async fn cmd_relate(
    engine: &Engine,
    subject: String,
    predicate: String,
    object: String,
    source: Option<String>,
    actor: Option<String>,
    confidence: Option<f64>,
) -> Result<()> {
    let outcome = engine
        .relate(NewTriple {
            subject,
            predicate,
            object,
            source,
            actor,
            confidence,
        })
        .await?;
    print_json(&outcome)
}

pub fn cmd_query_graph(
    engine: &Engine,
    subject: Option<String>,
    predicate: Option<String>,
    object: Option<String>,
    limit: i64,
) -> Result<()> {
    let page = engine.query_graph(TripleFilter {
        subject,
        predicate,
        object,
        limit: Some(limit),
    })?;
    print_json(&page)
}

pub async fn cmd_update_triple(
    engine: &Engine,
    id: &str,
    predicate: Option<String>,
    object: Option<String>,
) -> Result<()> {
    let update = TripleUpdate {
        predicate,
        object,
        source: None,
        actor: None,
        confidence: None,
    };
    let triple = engine.update_triple(id, update).await?;
    print_json(&triple)
}

pub async fn cmd_upsert_triple(
    engine: &Engine,
    subject: String,
    predicate: String,
    object: String,
    source: Option<String>,
    confidence: Option<f64>,
) -> Result<()> {
    let result = engine
        .upsert_triple(NewTriple {
            subject,
            predicate,
            object,
            source,
            actor: None,
            confidence,
        })
        .await?;
    print_json(&result)
}

pub async fn cmd_resolve_conflict(engine: &Engine, conflict_id: &str, resolution: &str) -> Result<()> {
    let resolution = match resolution {
        "replace" => ConflictResolution::Replace,
        "retain_both" => ConflictResolution::RetainBoth,
        "reject" => ConflictResolution::Reject,
        other => bail!("unknown resolution `{other}`, expected replace, retain_both, or reject"),
    };
    let outcome = engine.resolve_conflict(conflict_id, resolution).await?;
    print_json(&outcome)
}
