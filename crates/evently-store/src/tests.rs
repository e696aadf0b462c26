//! Unit tests for the record store.

use rusqlite::Connection;

use crate::error::StoreError;
use crate::event::{find_events, get_event, save_event, EventFilter, NewEvent};
use crate::user::{create_user, get_user, set_user_active};

/// Creates an in-memory SQLite database with migrations applied.
fn test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("should enable foreign keys");
    evently_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn new_event(author_id: &str, title: &str) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        date: "2024-01-01".to_string(),
        description: "Kickoff".to_string(),
        author_id: author_id.to_string(),
    }
}

// ── save_event / get_event ───────────────────────────────────────────

#[test]
fn save_event_round_trips_through_get() {
    let conn = test_db();
    let author = create_user(&conn, "ada").unwrap();

    let saved = save_event(&conn, &new_event(&author.id, "Launch")).expect("save should succeed");
    assert!(!saved.id.is_empty());
    assert_eq!(saved.title, "Launch");
    assert_eq!(saved.date, "2024-01-01");
    assert_eq!(saved.description, "Kickoff");
    assert_eq!(saved.author_id, author.id);

    let loaded = get_event(&conn, &saved.id).expect("saved event should be readable");
    assert_eq!(loaded, saved);
}

#[test]
fn identical_input_yields_distinct_records() {
    let conn = test_db();
    let author = create_user(&conn, "ada").unwrap();
    let input = new_event(&author.id, "Launch");

    let first = save_event(&conn, &input).unwrap();
    let second = save_event(&conn, &input).unwrap();
    assert_ne!(first.id, second.id);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn save_event_rejects_unknown_author() {
    let conn = test_db();

    let err = save_event(&conn, &new_event("ghost", "Launch")).expect_err("should fail");
    assert!(err.is_constraint_violation(), "unexpected error: {err:?}");
}

#[test]
fn get_event_missing_is_not_found() {
    let conn = test_db();
    match get_event(&conn, "nope") {
        Err(StoreError::EventNotFound(id)) => assert_eq!(id, "nope"),
        other => panic!("expected EventNotFound, got {other:?}"),
    }
}

#[test]
fn event_serializes_with_store_fields() {
    let conn = test_db();
    let author = create_user(&conn, "ada").unwrap();
    let saved = save_event(&conn, &new_event(&author.id, "Launch")).unwrap();

    let json = serde_json::to_value(&saved).unwrap();
    assert_eq!(json["id"], saved.id.as_str());
    assert_eq!(json["title"], "Launch");
    assert_eq!(json["author_id"], author.id.as_str());
}

// ── find_events ──────────────────────────────────────────────────────

#[test]
fn find_events_newest_first_with_limit() {
    let conn = test_db();
    let author = create_user(&conn, "ada").unwrap();

    for title in ["one", "two", "three"] {
        save_event(&conn, &new_event(&author.id, title)).unwrap();
    }

    let all = find_events(&conn, &EventFilter::default()).unwrap();
    let titles: Vec<&str> = all.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["three", "two", "one"]);

    let limited = find_events(
        &conn,
        &EventFilter {
            limit: Some(2),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].title, "three");
}

#[test]
fn find_events_filters_by_author() {
    let conn = test_db();
    let ada = create_user(&conn, "ada").unwrap();
    let bob = create_user(&conn, "bob").unwrap();

    save_event(&conn, &new_event(&ada.id, "ada's")).unwrap();
    save_event(&conn, &new_event(&bob.id, "bob's")).unwrap();

    let found = find_events(
        &conn,
        &EventFilter {
            author_id: Some(bob.id.clone()),
            limit: None,
        },
    )
    .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "bob's");
}

// ── users ────────────────────────────────────────────────────────────

#[test]
fn create_user_is_active() {
    let conn = test_db();
    let user = create_user(&conn, "ada").unwrap();
    assert!(user.active);

    let loaded = get_user(&conn, &user.id).unwrap();
    assert_eq!(loaded, user);
}

#[test]
fn duplicate_username_is_constraint_violation() {
    let conn = test_db();
    create_user(&conn, "ada").unwrap();
    let err = create_user(&conn, "ada").expect_err("duplicate should fail");
    assert!(err.is_constraint_violation());
}

#[test]
fn set_user_active_toggles_flag() {
    let conn = test_db();
    let user = create_user(&conn, "ada").unwrap();

    set_user_active(&conn, &user.id, false).unwrap();
    assert!(!get_user(&conn, &user.id).unwrap().active);

    match set_user_active(&conn, "ghost", true) {
        Err(StoreError::UserNotFound(id)) => assert_eq!(id, "ghost"),
        other => panic!("expected UserNotFound, got {other:?}"),
    }
}
