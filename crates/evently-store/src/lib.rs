//! Record store for Evently.
//!
//! Persists event records and the users that author them. All functions
//! take a borrowed [`rusqlite::Connection`] and are synchronous; async
//! callers run them inside `tokio::task::spawn_blocking` with a pooled
//! connection.
//!
//! Identifiers are assigned by the store (UUID v4), never by the caller,
//! so two saves of identical input always yield two distinct records.
//!
//! # Usage
//!
//! ```rust,ignore
//! use evently_store::{create_user, save_event, NewEvent};
//!
//! let author = create_user(&conn, "ada")?;
//! let event = save_event(
//!     &conn,
//!     &NewEvent {
//!         title: "Launch".to_string(),
//!         date: "2024-01-01".to_string(),
//!         description: "Kickoff".to_string(),
//!         author_id: author.id.clone(),
//!     },
//! )?;
//! ```

mod error;
mod event;
mod user;

pub use error::StoreError;
pub use event::{find_events, get_event, save_event, Event, EventFilter, NewEvent};
pub use user::{create_user, get_user, set_user_active, User};

#[cfg(test)]
mod tests;
