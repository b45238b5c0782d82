//! Database layer for the Tessera platform.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode
//! initialization, embedded SQL migrations, and the Registry Store: the
//! durable key/value contract the transaction event log (TEL) core
//! validates against. Every table is created through versioned migrations
//! managed by this crate.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a registry is a single-writer, append-heavy
//!   log with many readers; WAL gives concurrent readers alongside the one
//!   writer without an external database process.
//! - **`r2d2` connection pool**: bounded connection reuse without manual
//!   lifetime management.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!`, so the schema ships with the code that depends on it.
//! - **Idempotent writes**: escrow and index rows use `INSERT OR IGNORE`;
//!   replaying a validation attempt never duplicates durable state.

mod migrations;
mod pool;
pub mod store;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use store::StoreError;
