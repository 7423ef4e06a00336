//! Main database layer
//!
//! The asset DAG, the ORM-managed tables and the task queue all live in
//! one long-lived SQLite file. Handlers open a fresh connection per
//! request and drop it on return; there is no shared pool.

pub mod blobs;
pub mod repo;
pub mod schema;
pub mod tasks;

use crate::error::{Error, Result};
use rusqlite::Connection;

/// Open a connection to the main database.
///
/// Only the "sqlite" driver type is supported.
pub fn open(db_type: &str, filename: &str) -> Result<Connection> {
    match db_type {
        "sqlite" => Connection::open(filename)
            .map_err(|e| Error::Config(format!("{} ({})", e, filename))),
        other => Err(Error::Config(format!("invalid database type: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_unknown_type() {
        let err = open("postgres", ":memory:").unwrap_err();
        assert!(err.to_string().contains("invalid database type"));
    }

    #[test]
    fn test_open_sqlite_in_memory() {
        assert!(open("sqlite", ":memory:").is_ok());
    }
}
