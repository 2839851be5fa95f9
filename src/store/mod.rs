// src/store/mod.rs — Persistence for users, tasks and session records

pub mod schema;
pub mod store;
pub mod store_server;

use rusqlite::Connection;
use std::path::Path;

pub use store::Store;
pub use store_server::{spawn_store_server, StoreHandle};

/// Open (or create) the database at the given path and migrate it.
pub fn open(path: &Path) -> anyhow::Result<Store> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    schema::run_migrations(&conn)?;
    tracing::info!("database ready at {}", path.display());
    Ok(Store::new(conn))
}

/// In-memory database (tests, throwaway servers).
pub fn open_in_memory() -> anyhow::Result<Store> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    schema::run_migrations(&conn)?;
    Ok(Store::new(conn))
}
