//! Error types for the record store.

/// Errors that can occur during record store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database operation failed.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No event exists with the given ID.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// No user exists with the given ID.
    #[error("user not found: {0}")]
    UserNotFound(String),
}

impl StoreError {
    /// Returns `true` if this error was caused by a constraint violation
    /// (unique key, foreign key, NOT NULL).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Database(rusqlite::Error::SqliteFailure(code, _))
                if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation
        )
    }
}
