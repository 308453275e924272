//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// memory - a single-owner, protocol-mediated knowledge store
#[derive(Parser)]
#[command(name = "memory")]
#[command(about = "Typed facts, graph triples, and hybrid retrieval for LLM memory", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "memory.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store a new entry
    Store {
        /// Topic/title for the entry
        #[arg(long)]
        topic: String,

        /// Free-text content
        #[arg(long)]
        content: String,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Provenance source
        #[arg(long)]
        source: Option<String>,

        /// Actor responsible for this entry
        #[arg(long)]
        actor: Option<String>,

        /// Confidence in [0, 1]
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Update an existing entry
    Update {
        /// Entry id
        id: String,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        tags: Option<String>,
    },

    /// Query entries by topic/content/tag substring
    Query {
        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        content: Option<String>,

        /// Comma-separated tags, all of which must be present
        #[arg(long)]
        tags: Option<String>,

        #[arg(long, default_value = "50")]
        limit: i64,
    },

    /// Delete an entry or triple (soft delete)
    Delete {
        /// Row id to delete
        id: String,

        /// Kind of row: entry or triple
        #[arg(long, default_value = "entry")]
        kind: String,
    },

    /// Create a directed subject-predicate-object relationship
    Relate {
        subject: String,
        predicate: String,
        object: String,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        actor: Option<String>,

        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Query the graph by subject/predicate/object substring
    QueryGraph {
        #[arg(long)]
        subject: Option<String>,

        #[arg(long)]
        predicate: Option<String>,

        #[arg(long)]
        object: Option<String>,

        #[arg(long, default_value = "50")]
        limit: i64,
    },

    /// Update an existing triple
    UpdateTriple {
        id: String,

        #[arg(long)]
        predicate: Option<String>,

        #[arg(long)]
        object: Option<String>,
    },

    /// Create a triple, replacing any existing (subject, predicate) match
    UpsertTriple {
        subject: String,
        predicate: String,
        object: String,

        #[arg(long)]
        source: Option<String>,

        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Resolve a pending conflict surfaced by `relate`
    ResolveConflict {
        conflict_id: String,

        /// One of: replace, retain_both, reject
        resolution: String,
    },

    /// Resolve or create a canonical entity by exact name match
    UpsertEntity { name: String },

    /// Merge one canonical entity into another
    MergeEntities { keep_id: String, merge_id: String },

    /// Undo the most recent mutations
    Undo {
        /// Number of transactions to undo
        #[arg(default_value = "1")]
        count: i64,
    },

    /// Show the transaction log
    History {
        #[arg(long, default_value = "50")]
        limit: i64,

        /// Filter by entity type: entry, triple, entity, alias
        #[arg(long)]
        entity_type: Option<String>,

        #[arg(long)]
        cursor: Option<String>,
    },

    /// Ingest free text, chunking into entries
    Ingest {
        /// Read content from this file instead of --text
        #[arg(long)]
        file: Option<PathBuf>,

        /// Inline content to ingest
        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        source: Option<String>,

        /// Drive any remaining async batches to completion before returning
        #[arg(long)]
        wait: bool,
    },

    /// Check the status of an ingestion task
    IngestionStatus { task_id: String },

    /// Hybrid lexical/semantic/graph retrieval
    Retrieve {
        query: String,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        cursor: Option<String>,
    },

    /// Page through stored entries newest-first
    Entries {
        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        cursor: Option<String>,
    },

    /// Page through stored triples newest-first
    Triples {
        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        cursor: Option<String>,
    },

    /// Page through the transaction log newest-first
    Transactions {
        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        cursor: Option<String>,
    },
}
