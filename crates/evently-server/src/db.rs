//! Running record store calls from async code.

use evently_db::DbPool;
use evently_store::StoreError;
use rusqlite::Connection;
use thiserror::Error;

/// Failure of a store call made through [`with_connection`].
#[derive(Debug, Error)]
pub enum DbTaskError {
    /// No pooled connection became available.
    #[error("database connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),

    /// The store call itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking task panicked or was cancelled.
    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs `f` with a pooled connection on the blocking thread pool.
pub async fn with_connection<T, F>(pool: &DbPool, f: F) -> Result<T, DbTaskError>
where
    F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<T, DbTaskError> {
        let conn = pool.get()?;
        Ok(f(&conn)?)
    })
    .await?
}
