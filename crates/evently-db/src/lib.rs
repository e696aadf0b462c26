//! Database layer for Evently.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization
//! and embedded SQL migrations. Every table the server touches is created
//! through a versioned migration owned by this crate.
//!
//! SQLite runs in WAL mode so request handlers can read while a single
//! writer inserts new records. Migration SQL is compiled into the binary
//! with `include_str!` and always ships with the code that depends on it.

mod migrations;
mod pool;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError, IN_MEMORY};
