//! The create-event operation: save a new event, then announce it.
//!
//! Steps run strictly in order and stop at the first failure:
//!
//! 1. resolve the author named by the request against the `users` table
//! 2. save the record (the store assigns `id` and `created_at`)
//! 3. publish `{ "newEvent": <record> }` on [`topics::EVENT_ADDED`]
//! 4. return the saved record
//!
//! A failed save never publishes. A failed publish happens after the row is
//! committed and is reported as [`CreateEventError::Notification`] carrying
//! the saved ID. Both suspend points are bounded by the caller's timeout;
//! a save that misses it before committing is rolled back. Nothing is
//! retried.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use evently_db::DbPool;
use evently_pubsub::{topics, PubSubError, Publisher};
use evently_store::{get_user, save_event, Event, NewEvent, StoreError};
use rusqlite::TransactionBehavior;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::DbTaskError;
use crate::identity::{Author, IdentityError};

/// Client-supplied fields of a new event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEvent {
    pub title: String,
    pub date: String,
    pub description: String,
}

/// Payload published on [`topics::EVENT_ADDED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAddedMessage {
    #[serde(rename = "newEvent")]
    pub new_event: Event,
}

/// The suspend point that exceeded its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Persist,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persist => f.write_str("persist"),
            Self::Publish => f.write_str("publish"),
        }
    }
}

/// Errors returned by [`create_event`].
#[derive(Debug, Error)]
pub enum CreateEventError {
    /// The author could not be resolved. Nothing was written.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// The record could not be saved. Nothing was published.
    #[error("failed to save event: {0}")]
    Persistence(#[from] DbTaskError),

    /// The record was saved but the notification could not be published.
    #[error("event {id} saved but not announced: {source}")]
    Notification {
        /// ID of the saved record.
        id: String,
        source: PubSubError,
    },

    /// A step did not finish in time. For [`Stage::Persist`] nothing was
    /// committed; for [`Stage::Publish`] `id` names the saved record.
    #[error("{stage} step timed out after {}ms", .timeout.as_millis())]
    Timeout {
        stage: Stage,
        timeout: Duration,
        id: Option<String>,
    },
}

impl CreateEventError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Identity(_) => "IDENTITY",
            Self::Persistence(_) => "PERSISTENCE",
            Self::Notification { .. } => "NOTIFICATION",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }

    /// ID of the record if it is known to have been saved.
    pub fn saved_id(&self) -> Option<&str> {
        match self {
            Self::Notification { id, .. } => Some(id),
            Self::Timeout { id, .. } => id.as_deref(),
            _ => None,
        }
    }
}

/// Creates an event authored by `author` and announces it to subscribers.
///
/// # Errors
///
/// See [`CreateEventError`]. Identity and persistence failures leave no
/// trace, and neither does a save that misses its deadline before
/// committing. Notification failures and publish timeouts leave a saved
/// record.
pub async fn create_event<P: Publisher>(
    pool: &DbPool,
    publisher: &P,
    timeout: Duration,
    author: Option<&Author>,
    input: CreateEvent,
) -> Result<Event, CreateEventError> {
    let author = author.ok_or(IdentityError::Missing)?;

    let new_event = NewEvent {
        title: input.title,
        date: input.date,
        description: input.description,
        author_id: author.user_id.clone(),
    };

    let gate = CommitGate::default();
    let mut save = tokio::task::spawn_blocking({
        let pool = pool.clone();
        let gate = gate.clone();
        move || save_as_author(&pool, &new_event, &gate)
    });

    let joined = match tokio::time::timeout(timeout, &mut save).await {
        Ok(joined) => joined,
        Err(_) if gate.abandon() => {
            tracing::error!(author_id = %author.user_id, ?timeout, "event save timed out");
            return Err(CreateEventError::Timeout {
                stage: Stage::Persist,
                timeout,
                id: None,
            });
        }
        Err(_) => {
            // The task already claimed the gate, so its commit decides.
            tracing::warn!(author_id = %author.user_id, ?timeout, "event save committing past deadline");
            save.await
        }
    };

    let Some(event) = joined.map_err(DbTaskError::from)?? else {
        return Err(CreateEventError::Timeout {
            stage: Stage::Persist,
            timeout,
            id: None,
        });
    };

    tracing::info!(event_id = %event.id, author_id = %event.author_id, "event created");

    let message = EventAddedMessage {
        new_event: event.clone(),
    };
    match tokio::time::timeout(timeout, publisher.publish(topics::EVENT_ADDED, &message)).await {
        Ok(Ok(delivered)) => {
            tracing::debug!(event_id = %event.id, delivered, "event announced");
            Ok(event)
        }
        Ok(Err(source)) => {
            tracing::error!(event_id = %event.id, error = %source, "failed to announce event");
            Err(CreateEventError::Notification {
                id: event.id,
                source,
            })
        }
        Err(_) => {
            tracing::error!(event_id = %event.id, ?timeout, "event announcement timed out");
            Err(CreateEventError::Timeout {
                stage: Stage::Publish,
                timeout,
                id: Some(event.id),
            })
        }
    }
}

const GATE_OPEN: u8 = 0;
const GATE_COMMITTING: u8 = 1;
const GATE_ABANDONED: u8 = 2;

/// Decides whether a save commits or is abandoned by its caller.
///
/// Exactly one side wins. The save task claims the gate right before
/// committing; the caller claims it when its deadline passes. A save whose
/// caller has gone rolls back.
#[derive(Debug, Clone, Default)]
struct CommitGate(Arc<AtomicU8>);

impl CommitGate {
    /// Claims the gate for committing. False if the caller gave up.
    fn commit(&self) -> bool {
        self.0
            .compare_exchange(GATE_OPEN, GATE_COMMITTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claims the gate for abandoning. False if a commit is under way.
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(GATE_OPEN, GATE_ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

fn persistence(err: impl Into<StoreError>) -> CreateEventError {
    DbTaskError::from(err.into()).into()
}

/// Checks the author and inserts the row in one write transaction.
///
/// Returns `Ok(None)` when the caller abandoned the save; the transaction
/// is rolled back and nothing is written.
fn save_as_author(
    pool: &DbPool,
    new_event: &NewEvent,
    gate: &CommitGate,
) -> Result<Option<Event>, CreateEventError> {
    let mut conn = pool.get().map_err(DbTaskError::from)?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(persistence)?;

    let user = match get_user(&tx, &new_event.author_id) {
        Ok(user) => user,
        Err(StoreError::UserNotFound(id)) => return Err(IdentityError::UnknownUser(id).into()),
        Err(e) => return Err(persistence(e)),
    };
    if !user.active {
        return Err(IdentityError::Inactive(user.id).into());
    }

    let event = save_event(&tx, new_event).map_err(persistence)?;

    if !gate.commit() {
        tracing::warn!(event_id = %event.id, "save abandoned by caller, rolling back");
        return Ok(None);
    }
    tx.commit().map_err(persistence)?;
    Ok(Some(event))
}
