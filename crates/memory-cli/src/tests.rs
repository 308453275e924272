//! CLI command tests
//!
//! Exercises the `cmd_*` handlers directly against an on-disk database
//! opened through `open_engine`, the same way the CLI itself constructs
//! an `Engine` per invocation.

use memory_core::Engine;

use crate::commands;

fn setup_test_engine() -> (tempfile::TempDir, Engine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("memory.db");
    let engine = commands::open_engine(&db_path).expect("open engine");
    (dir, engine)
}

#[tokio::test]
async fn cmd_store_then_query_finds_the_entry() {
    let (_dir, engine) = setup_test_engine();

    let result = commands::cmd_store(
        &engine,
        "rust".into(),
        "ownership and borrowing".into(),
        Some("lang,systems"),
        Some("cli-test".into()),
        None,
        None,
    )
    .await;
    assert!(result.is_ok());

    let entries = engine
        .query(memory_core::EntryFilter {
            topic: Some("rust".into()),
            ..Default::default()
        })
        .expect("query");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "ownership and borrowing");
    assert!(entries[0].tags.contains("systems"));
}

#[tokio::test]
async fn cmd_delete_soft_deletes_the_entry() {
    let (_dir, engine) = setup_test_engine();
    commands::cmd_store(&engine, "x".into(), "y".into(), None, None, None, None)
        .await
        .expect("store");
    let id = engine
        .query(memory_core::EntryFilter::default())
        .expect("query")[0]
        .id
        .clone();

    let result = commands::cmd_delete(&engine, &id, "entry").await;
    assert!(result.is_ok());

    let remaining = engine
        .query(memory_core::EntryFilter::default())
        .expect("query after delete");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn cmd_undo_reverts_the_most_recent_store() {
    let (_dir, engine) = setup_test_engine();
    commands::cmd_store(&engine, "x".into(), "y".into(), None, None, None, None)
        .await
        .expect("store");
    assert_eq!(
        engine
            .query(memory_core::EntryFilter::default())
            .expect("query")
            .len(),
        1
    );

    let result = commands::cmd_undo(&engine, 1);
    assert!(result.is_ok());

    let remaining = engine
        .query(memory_core::EntryFilter::default())
        .expect("query after undo");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn cmd_history_reports_the_store_transaction() {
    let (_dir, engine) = setup_test_engine();
    commands::cmd_store(&engine, "x".into(), "y".into(), None, None, None, None)
        .await
        .expect("store");

    let result = commands::cmd_history(&engine, 50, None, None);
    assert!(result.is_ok());

    let page = engine.history(Some(50), None, None).expect("history");
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].op, memory_core::models::TransactionOp::Create);
}
