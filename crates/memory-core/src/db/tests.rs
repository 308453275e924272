use crate::models::{
    EntryFilter, EntryUpdate, NewEntry, NewTriple, TripleFilter, TripleUpdate,
};

use super::Database;

fn test_db() -> Database {
    Database::in_memory().expect("in-memory database")
}

#[test]
fn entry_create_read_update_delete_round_trip() {
    let db = test_db();
    let entry = db
        .create_entry(NewEntry {
            topic: "rust borrow checker".into(),
            content: "non-lexical lifetimes landed in 2018".into(),
            ..Default::default()
        })
        .expect("create");
    assert_eq!(entry.status, "active");
    assert!(entry.deleted_at.is_none());

    let fetched = db.get_entry(&entry.id).expect("get");
    assert_eq!(fetched.topic, entry.topic);

    let updated = db
        .update_entry(
            &entry.id,
            EntryUpdate {
                content: Some("NLL landed in Rust 2018".into()),
                ..Default::default()
            },
        )
        .expect("update");
    assert_eq!(updated.content, "NLL landed in Rust 2018");
    assert_eq!(updated.topic, entry.topic);

    db.delete_entry(&entry.id).expect("delete");
    let err = db.get_entry(&entry.id).unwrap_err();
    assert_eq!(err.kind(), "not_found");

    let visible = db
        .query_entries(EntryFilter::default())
        .expect("query after delete");
    assert!(!visible.iter().any(|e| e.id == entry.id));
}

#[test]
fn entry_query_filters_by_topic_substring_and_tags() {
    let db = test_db();
    let mut tagged = NewEntry {
        topic: "ocean currents".into(),
        content: "the gulf stream carries warm water north".into(),
        ..Default::default()
    };
    tagged.tags.insert("oceanography".into());
    db.create_entry(tagged).expect("create tagged");

    db.create_entry(NewEntry {
        topic: "mountain ranges".into(),
        content: "the andes run the length of south america".into(),
        ..Default::default()
    })
    .expect("create untagged");

    let by_topic = db
        .query_entries(EntryFilter {
            topic: Some("ocean".into()),
            ..Default::default()
        })
        .expect("query by topic");
    assert_eq!(by_topic.len(), 1);
    assert_eq!(by_topic[0].topic, "ocean currents");

    let by_tag = db
        .query_entries(EntryFilter {
            tags: ["oceanography".to_string()].into_iter().collect(),
            ..Default::default()
        })
        .expect("query by tag");
    assert_eq!(by_tag.len(), 1);
}

#[test]
fn triple_upsert_updates_existing_subject_predicate() {
    let db = test_db();
    let first = db
        .upsert_triple(NewTriple {
            subject: "rust".into(),
            predicate: "created_by".into(),
            object: "graydon hoare".into(),
            source: None,
            actor: None,
            confidence: Some(0.9),
        })
        .expect("initial upsert");

    let second = db
        .upsert_triple(NewTriple {
            subject: "rust".into(),
            predicate: "created_by".into(),
            object: "mozilla research".into(),
            source: None,
            actor: None,
            confidence: Some(0.8),
        })
        .expect("upsert over existing");

    assert_eq!(first.id, second.id);
    assert_eq!(second.object, "mozilla research");

    let all = db
        .query_triples(TripleFilter {
            subject: Some("rust".into()),
            ..Default::default()
        })
        .expect("query");
    assert_eq!(all.len(), 1);
}

#[test]
fn triple_update_then_undo_restores_previous_object() {
    let db = test_db();
    let triple = db
        .create_triple(NewTriple {
            subject: "javascript".into(),
            predicate: "standardized_as".into(),
            object: "ECMAScript".into(),
            source: None,
            actor: None,
            confidence: None,
        })
        .expect("create");

    db.update_triple(
        &triple.id,
        TripleUpdate {
            object: Some("ECMA-262".into()),
            ..Default::default()
        },
    )
    .expect("update");

    let result = db.undo(1).expect("undo");
    assert_eq!(result.reverted.len(), 1);

    let restored = db.get_triple(&triple.id).expect("get after undo");
    assert_eq!(restored.object, "ECMAScript");
}

#[test]
fn undo_of_create_soft_deletes_entry() {
    let db = test_db();
    let entry = db
        .create_entry(NewEntry {
            topic: "temp".into(),
            content: "should be undone".into(),
            ..Default::default()
        })
        .expect("create");

    db.undo(1).expect("undo create");
    let err = db.get_entry(&entry.id).unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[test]
fn undo_is_idempotent_against_already_reverted_transactions() {
    let db = test_db();
    db.create_entry(NewEntry {
        topic: "only entry".into(),
        content: "x".into(),
        ..Default::default()
    })
    .expect("create");

    let first = db.undo(5).expect("first undo");
    assert_eq!(first.reverted.len(), 1);

    let second = db.undo(5).expect("second undo");
    assert_eq!(second.reverted.len(), 0);
}

#[test]
fn entity_merge_reassigns_triples_entries_and_aliases() {
    let db = test_db();
    let keep = db.create_entity("JavaScript").expect("create keep");
    let merge = db.create_entity("ECMAScript").expect("create merge");

    let triple = db
        .create_triple(NewTriple {
            subject: "ECMAScript".into(),
            predicate: "standardized_by".into(),
            object: "ECMA International".into(),
            source: None,
            actor: None,
            confidence: None,
        })
        .expect("create triple");

    db.merge_entities(&keep.id, &merge.id).expect("merge");

    let resolved = db.resolve("ecmascript").expect("resolve").expect("found");
    assert_eq!(resolved.id, keep.id);

    let after = db.get_triple(&triple.id).expect("get triple");
    assert_eq!(after.subject, "JavaScript");

    let merge_still_exists = db.get_entity(&merge.id);
    assert!(merge_still_exists.is_err());
}

#[test]
fn entity_merge_rejects_self_merge() {
    let db = test_db();
    let entity = db.create_entity("Rust").expect("create");
    let err = db.merge_entities(&entity.id, &entity.id).unwrap_err();
    assert_eq!(err.kind(), "validation");
}

#[test]
fn entity_merge_then_undo_restores_merged_entity() {
    let db = test_db();
    let keep = db.create_entity("JavaScript").expect("create keep");
    let merge = db.create_entity("ECMAScript").expect("create merge");

    let triple = db
        .create_triple(NewTriple {
            subject: "ECMAScript".into(),
            predicate: "standardized_by".into(),
            object: "ECMA International".into(),
            source: None,
            actor: None,
            confidence: None,
        })
        .expect("create triple");

    db.merge_entities(&keep.id, &merge.id).expect("merge");
    db.undo(1).expect("undo merge");

    let restored = db.get_entity(&merge.id).expect("merged entity restored");
    assert_eq!(restored.name, "ECMAScript");

    let triple_after = db.get_triple(&triple.id).expect("get triple");
    assert_eq!(triple_after.subject, "ECMAScript");
}

#[test]
fn history_filters_by_entity_kind() {
    let db = test_db();
    db.create_entry(NewEntry {
        topic: "a".into(),
        content: "b".into(),
        ..Default::default()
    })
    .expect("create entry");
    db.create_triple(NewTriple {
        subject: "x".into(),
        predicate: "y".into(),
        object: "z".into(),
        source: None,
        actor: None,
        confidence: None,
    })
    .expect("create triple");

    let entry_history = db
        .history(50, Some(crate::models::EntityKind::Entry), None)
        .expect("history");
    assert!(entry_history.iter().all(|t| t.entity_type == crate::models::EntityKind::Entry));

    let all_history = db.history(50, None, None).expect("history all");
    assert_eq!(all_history.len(), 2);
}

#[test]
fn undo_reverts_entity_and_alias_creation() {
    let db = test_db();
    let entity = db.create_entity("Rust").expect("create entity");
    db.add_alias(&entity.id, "rustlang").expect("add alias");

    // Most recent transaction is the alias CREATE, then the entity CREATE.
    db.undo(1).expect("undo alias create");
    assert!(db
        .resolve_exact("rustlang")
        .expect("resolve")
        .is_none());
    let still_there = db.get_entity(&entity.id).expect("entity survives alias undo");
    assert_eq!(still_there.name, "Rust");

    db.undo(1).expect("undo entity create");
    assert!(db.get_entity(&entity.id).is_err());
}
