//! memory - a single-owner, protocol-mediated knowledge store
//!
//! Usage:
//!   memory store --topic T --content C     Store a new entry
//!   memory retrieve "query text"           Hybrid lexical/semantic/graph retrieval
//!   memory relate SUBJECT PREDICATE OBJECT Create a graph triple
//!   memory history                         Show the transaction log

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let engine = commands::open_engine(&cli.db)?;

    match cli.command {
        Commands::Store {
            topic,
            content,
            tags,
            source,
            actor,
            confidence,
        } => {
            commands::cmd_store(
                &engine,
                topic,
                content,
                tags.as_deref(),
                source,
                actor,
                confidence,
            )
            .await
        }
        Commands::Update {
            id,
            topic,
            content,
            tags,
        } => commands::cmd_update(&engine, &id, topic, content, tags.as_deref()).await,
        Commands::Query {
            topic,
            content,
            tags,
            limit,
        } => commands::cmd_query(&engine, topic, content, tags.as_deref(), limit),
        Commands::Delete { id, kind } => commands::cmd_delete(&engine, &id, &kind).await,
        Commands::Relate {
            subject,
            predicate,
            object,
            source,
            actor,
            confidence,
        } => commands::cmd_relate(&engine, subject, predicate, object, source, actor, confidence).await,
        Commands::QueryGraph {
            subject,
            predicate,
            object,
            limit,
        } => commands::cmd_query_graph(&engine, subject, predicate, object, limit),
        Commands::UpdateTriple {
            id,
            predicate,
            object,
        } => commands::cmd_update_triple(&engine, &id, predicate, object).await,
        Commands::UpsertTriple {
            subject,
            predicate,
            object,
            source,
            confidence,
        } => commands::cmd_upsert_triple(&engine, subject, predicate, object, source, confidence).await,
        Commands::ResolveConflict {
            conflict_id,
            resolution,
        } => commands::cmd_resolve_conflict(&engine, &conflict_id, &resolution).await,
        Commands::UpsertEntity { name } => commands::cmd_upsert_entity(&engine, &name).await,
        Commands::MergeEntities { keep_id, merge_id } => {
            commands::cmd_merge_entities(&engine, &keep_id, &merge_id).await
        }
        Commands::Undo { count } => commands::cmd_undo(&engine, count),
        Commands::History { limit, entity_type, cursor } => {
            commands::cmd_history(&engine, limit, entity_type.as_deref(), cursor.as_deref())
        }
        Commands::Ingest {
            file,
            text,
            source,
            wait,
        } => commands::cmd_ingest(&engine, file.as_deref(), text, source, wait).await,
        Commands::IngestionStatus { task_id } => commands::cmd_ingestion_status(&engine, &task_id),
        Commands::Retrieve {
            query,
            limit,
            cursor,
        } => commands::cmd_retrieve(&engine, query, limit, cursor).await,
        Commands::Entries { limit, cursor } => {
            commands::cmd_entries(&engine, limit, cursor.as_deref())
        }
        Commands::Triples { limit, cursor } => {
            commands::cmd_triples(&engine, limit, cursor.as_deref())
        }
        Commands::Transactions { limit, cursor } => {
            commands::cmd_transactions(&engine, limit, cursor.as_deref())
        }
    }
}
