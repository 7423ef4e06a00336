//! Main database provisioning
//!
//! The server assumes the main database exists with these tables; they are
//! provisioned out of band. This DDL is shipped for bootstrap tooling and
//! for tests.

use crate::error::Result;
use rusqlite::Connection;

/// DDL for the asset DAG and task queue tables.
pub const MAIN_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS netstorage_hubs (
        uuid        varchar(64) NOT NULL UNIQUE,
        hubname     TEXT NOT NULL,
        active      int NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS netstorage_projects (
        uuid        varchar(64) NOT NULL UNIQUE,
        projectname TEXT NOT NULL,
        hubuuid     varchar(64) NOT NULL,
        active      int NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS netstorage_folders (
        uuid        varchar(64) NOT NULL UNIQUE,
        foldername  TEXT NOT NULL,
        projectuuid varchar(64) NOT NULL,
        parentuuid  varchar(64) NOT NULL DEFAULT '',
        active      int NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS netstorage_items (
        uuid        varchar(64) NOT NULL UNIQUE,
        itemname    TEXT NOT NULL,
        folderuuid  varchar(64) NOT NULL,
        active      int NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS netstorage_entities (
        uuid        varchar(64) NOT NULL UNIQUE,
        itemuuid    varchar(64) NOT NULL,
        datatype    TEXT NOT NULL DEFAULT '',
        sha1        varchar(64) NOT NULL,
        filesize    int NOT NULL,
        metadata    TEXT NOT NULL DEFAULT '',
        timestamp   varchar(64) NOT NULL,
        active      int NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS netstorage_tasks (
        uuid            varchar(64) NOT NULL UNIQUE,
        taskname        TEXT NOT NULL,
        status          varchar(32) NOT NULL,
        parameters      TEXT NOT NULL DEFAULT '',
        timestamp       varchar(64) NOT NULL,
        transactionuuid varchar(64) NOT NULL DEFAULT '',
        worker          TEXT NOT NULL DEFAULT '',
        workersecret    varchar(64) NOT NULL DEFAULT '',
        taskresult      TEXT NOT NULL DEFAULT ''
    );
"#;

/// Create the main tables if they do not exist.
pub fn provision(conn: &Connection) -> Result<()> {
    conn.execute_batch(MAIN_TABLES)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        provision(&conn).unwrap();
        provision(&conn).unwrap();

        let tables = [
            "netstorage_hubs",
            "netstorage_projects",
            "netstorage_folders",
            "netstorage_items",
            "netstorage_entities",
            "netstorage_tasks",
        ];
        for table in tables {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }
}
