//! Paginated read resources: entries, triples, transactions

use anyhow::Result;
use memory_core::Engine;

use super::print_json;

pub fn cmd_entries(engine: &Engine, limit: Option<i64>, cursor: Option<&str>) -> Result<()> {
    print_json(&engine.read_entries(limit, cursor)?)
}

pub fn cmd_triples(engine: &Engine, limit: Option<i64>, cursor: Option<&str>) -> Result<()> {
    print_json(&engine.read_triples(limit, cursor)?)
}

pub fn cmd_transactions(engine: &Engine, limit: Option<i64>, cursor: Option<&str>) -> Result<()> {
    print_json(&engine.read_transactions(limit, cursor)?)
}
