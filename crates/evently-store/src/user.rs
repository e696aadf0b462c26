//! User records. Users are the authors of events.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::StoreError;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Inactive users may not author new events.
    pub active: bool,
    pub created_at: String,
}

/// Creates a new active user.
///
/// # Errors
///
/// Returns `StoreError::Database` on SQL failure; a duplicate `username`
/// is reported as a constraint violation.
pub fn create_user(conn: &Connection, username: &str) -> Result<User, StoreError> {
    let id = Uuid::new_v4().to_string();
    let created_at: String = conn.query_row(
        "INSERT INTO users (id, username, active) VALUES (?1, ?2, 1) RETURNING created_at",
        params![id, username],
        |row| row.get(0),
    )?;

    Ok(User {
        id,
        username: username.to_string(),
        active: true,
        created_at,
    })
}

/// Retrieves a user by ID.
pub fn get_user(conn: &Connection, id: &str) -> Result<User, StoreError> {
    conn.query_row(
        "SELECT id, username, active, created_at FROM users WHERE id = ?1",
        [id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                active: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::UserNotFound(id.to_string()))
}

/// Activates or deactivates a user.
pub fn set_user_active(conn: &Connection, id: &str, active: bool) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE users SET active = ?1 WHERE id = ?2",
        params![active, id],
    )?;
    if changed == 0 {
        return Err(StoreError::UserNotFound(id.to_string()));
    }
    Ok(())
}
