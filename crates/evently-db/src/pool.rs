//! SQLite connection pool.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections. Ignored for [`IN_MEMORY`].
    pub pool_max_size: u32,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Pool of SQLite connections shared by the store and the server.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors raised while building a [`DbPool`].
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool over the database at `db_path`.
///
/// File databases use WAL journaling. Every connection enforces foreign
/// keys and waits up to `busy_timeout_ms` for a locked database.
///
/// Each connection to [`IN_MEMORY`] would open its own empty database,
/// so an in-memory pool always holds exactly one connection.
///
/// # Errors
///
/// Returns `PoolError::PoolInit` if the first connections cannot be opened
/// or configured.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let max_size = if db_path == IN_MEMORY {
        1
    } else {
        settings.pool_max_size
    };

    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| configure_connection(conn, settings.busy_timeout_ms));

    let pool = Pool::builder().max_size(max_size).build(manager)?;
    tracing::debug!(path = db_path, max_size, "database pool ready");
    Ok(pool)
}

fn configure_connection(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    // In-memory databases cannot use WAL and report "memory".
    let journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    if journal_mode != "wal" && journal_mode != "memory" {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {journal_mode}, expected wal")),
        ));
    }

    conn.execute_batch(&format!(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
}
