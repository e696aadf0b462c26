//! Event records.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Default number of events returned by [`find_events`].
const DEFAULT_LIMIT: u32 = 20;

/// A persisted event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier (UUID v4).
    pub id: String,
    /// Event title.
    pub title: String,
    /// Text-encoded date. The store does not interpret it.
    pub date: String,
    /// Free-form description.
    pub description: String,
    /// ID of the user who created the event.
    pub author_id: String,
    /// ISO 8601 creation timestamp (UTC).
    pub created_at: String,
}

/// Fields for an event that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub date: String,
    pub description: String,
    pub author_id: String,
}

/// Filter criteria for [`find_events`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Only events created by this user.
    pub author_id: Option<String>,
    /// Maximum number of events to return (default: 20).
    pub limit: Option<u32>,
}

/// Saves a new event and returns the stored record.
///
/// The ID is generated here and `created_at` is assigned by SQLite, so
/// the returned [`Event`] is exactly what a later [`get_event`] yields.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure, including a foreign key
/// violation when `author_id` does not name an existing user.
pub fn save_event(conn: &Connection, new_event: &NewEvent) -> Result<Event, StoreError> {
    let id = Uuid::new_v4().to_string();

    let created_at: String = conn.query_row(
        "INSERT INTO events (id, title, date, description, author_id)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING created_at",
        params![
            id,
            new_event.title,
            new_event.date,
            new_event.description,
            new_event.author_id,
        ],
        |row| row.get(0),
    )?;

    tracing::debug!(event_id = %id, author_id = %new_event.author_id, "event row inserted");

    Ok(Event {
        id,
        title: new_event.title.clone(),
        date: new_event.date.clone(),
        description: new_event.description.clone(),
        author_id: new_event.author_id.clone(),
        created_at,
    })
}

/// Retrieves an event by ID.
pub fn get_event(conn: &Connection, id: &str) -> Result<Event, StoreError> {
    conn.query_row(
        "SELECT id, title, date, description, author_id, created_at
         FROM events WHERE id = ?1",
        [id],
        map_row_to_event,
    )
    .optional()?
    .ok_or_else(|| StoreError::EventNotFound(id.to_string()))
}

/// Finds events matching `filter`, newest first.
pub fn find_events(conn: &Connection, filter: &EventFilter) -> Result<Vec<Event>, StoreError> {
    let limit = filter.limit.unwrap_or(DEFAULT_LIMIT);

    // rowid breaks ties between events created within the same millisecond.
    let mut stmt = conn.prepare(
        "SELECT id, title, date, description, author_id, created_at
         FROM events
         WHERE (?1 IS NULL OR author_id = ?1)
         ORDER BY created_at DESC, rowid DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![filter.author_id, limit], map_row_to_event)?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

fn map_row_to_event(row: &Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        description: row.get(3)?,
        author_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}
