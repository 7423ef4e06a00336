//! Session log database
//!
//! Each server process creates a fresh `<prefix><YYYYMMDD_HHMMSS>.db`
//! SQLite file holding the `sessions` and `logs` tables. The handle keeps
//! a single connection behind a mutex so interleaved log inserts are
//! serialised by construction; it is shared process-wide and used by every
//! handler. A failed log insert terminates the process: the server refuses
//! to run unobservable.

use crate::error::Result;
use crate::util::new_uuid;
use chrono::{Local, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SESSION_LOG_TABLES: &str = r#"
    CREATE TABLE sessions (
        sessionuuid  varchar(64) NOT NULL UNIQUE,
        token        varchar(512) NOT NULL,
        userid       varchar(64) NOT NULL,
        status       varchar(32) NOT NULL,
        timestamp    varchar(64) NOT NULL
    );

    CREATE TABLE logs (
        loguuid      varchar(64) NOT NULL,
        logindex     int DEFAULT 0,
        sessionuuid  varchar(64) NOT NULL,
        userid       varchar(64) NOT NULL,
        logtype      varchar(6) NOT NULL,
        timestamp    varchar(64) NOT NULL,
        message      TEXT DEFAULT ''
    );
"#;

/// How far a log message travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Emit to the console and the log database
    Console,
    /// Log database only
    DbOnly,
    /// Suppressed
    Debug,
}

/// Fixed six-character event tags stored with every log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    System,
    OrmRead,
    OrmSave,
    OrmDelete,
    OrmUpdate,
    TaskNew,
    TaskClear,
    TaskHandle,
    TaskUpdate,
    TaskStatus,
    DataHubs,
    DataProjects,
    DataRootFolders,
    DataSubFolders,
    DataItems,
    DataEntities,
    DataNewProject,
    DataNewFolder,
    DataNewItem,
    DataUpload,
    DataUpdateEntity,
    DataDownload,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::System => "SYSTEM",
            LogType::OrmRead => "ORMRED",
            LogType::OrmSave => "ORMSAV",
            LogType::OrmDelete => "ORMDEL",
            LogType::OrmUpdate => "ORMUPD",
            LogType::TaskNew => "TSKNEW",
            LogType::TaskClear => "TSKCLR",
            LogType::TaskHandle => "TSKHND",
            LogType::TaskUpdate => "TSKUPD",
            LogType::TaskStatus => "TSKSTA",
            LogType::DataHubs => "DATHUB",
            LogType::DataProjects => "DATPRJ",
            LogType::DataRootFolders => "DATRFL",
            LogType::DataSubFolders => "DATSFL",
            LogType::DataItems => "DATITM",
            LogType::DataEntities => "DATENT",
            LogType::DataNewProject => "DATNPR",
            LogType::DataNewFolder => "DATNFL",
            LogType::DataNewItem => "DATNIT",
            LogType::DataUpload => "DATUPL",
            LogType::DataUpdateEntity => "DATUEN",
            LogType::DataDownload => "DATDEN",
        }
    }
}

/// A resolved (or empty) session, constructed per request.
///
/// The log index is per request-lifetime and only ever touched under its
/// own lock; nothing else in the session mutates.
#[derive(Debug)]
pub struct Session {
    /// Session uuid, empty when unauthenticated
    pub uuid: String,
    /// Owning user id, empty when unauthenticated
    pub user_id: String,
    /// Bearer token, empty when unauthenticated
    pub token: String,
    /// True once the challenge has been accepted
    pub active: bool,
    /// Groups this request's log rows
    pub log_uuid: String,
    log_index: Mutex<i64>,
}

impl Session {
    /// An anonymous session for logging outside an authenticated request.
    pub fn empty() -> Self {
        Self {
            uuid: String::new(),
            user_id: String::new(),
            token: String::new(),
            active: false,
            log_uuid: new_uuid(),
            log_index: Mutex::new(1),
        }
    }

    pub(crate) fn resolved(uuid: String, user_id: String, token: String) -> Self {
        Self {
            uuid,
            user_id,
            token,
            active: true,
            log_uuid: new_uuid(),
            log_index: Mutex::new(1),
        }
    }

    fn next_log_index(&self) -> i64 {
        let mut index = self.log_index.lock().unwrap();
        let current = *index;
        *index = current + 1;
        current
    }
}

/// Handle to the per-process session log database.
pub struct SessionLog {
    conn: Mutex<Connection>,
    path: String,
}

impl SessionLog {
    /// Create a fresh timestamped log database under the given prefix.
    pub fn create(prefix: &str) -> Result<Self> {
        let path = format!("{}{}.db", prefix, Local::now().format("%Y%m%d_%H%M%S"));

        if let Some(parent) = Path::new(&path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(SESSION_LOG_TABLES)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Open an in-memory log database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SESSION_LOG_TABLES)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: ":memory:".to_string(),
        })
    }

    /// Path of the backing database file
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the underlying connection (serialised by the handle's mutex)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Record a log event for a session.
    ///
    /// `Console` also emits through `tracing`; `Debug` is a no-op. A
    /// database failure here exits the process.
    pub fn log(&self, session: &Session, message: &str, log_type: LogType, level: LogLevel) {
        if level == LogLevel::Debug {
            return;
        }

        if level == LogLevel::Console {
            tracing::info!(logtype = log_type.as_str(), "{}", message);
        }

        let log_index = session.next_log_index();
        let timestamp = Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        let inserted = conn.execute(
            "INSERT INTO logs (loguuid, logindex, sessionuuid, userid, logtype, timestamp, message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.log_uuid,
                log_index,
                session.uuid,
                session.user_id,
                log_type.as_str(),
                timestamp,
                message
            ],
        );

        if let Err(err) = inserted {
            tracing::error!(error = %err, "could not write log message to database");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_rows_carry_incrementing_index() {
        let log = SessionLog::open_in_memory().unwrap();
        let session = Session::empty();

        log.log(&session, "first", LogType::System, LogLevel::DbOnly);
        log.log(&session, "second", LogType::TaskNew, LogLevel::DbOnly);
        log.log(&session, "suppressed", LogType::System, LogLevel::Debug);

        let conn = log.connection();
        let rows: Vec<(i64, String, String)> = conn
            .prepare("SELECT logindex, logtype, message FROM logs ORDER BY logindex")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], (1, "SYSTEM".to_string(), "first".to_string()));
        assert_eq!(rows[1], (2, "TSKNEW".to_string(), "second".to_string()));
    }

    #[test]
    fn test_log_type_tags_are_six_chars() {
        let tags = [
            LogType::System,
            LogType::OrmRead,
            LogType::OrmSave,
            LogType::OrmDelete,
            LogType::OrmUpdate,
            LogType::TaskNew,
            LogType::TaskClear,
            LogType::TaskHandle,
            LogType::TaskUpdate,
            LogType::TaskStatus,
            LogType::DataHubs,
            LogType::DataProjects,
            LogType::DataRootFolders,
            LogType::DataSubFolders,
            LogType::DataItems,
            LogType::DataEntities,
            LogType::DataNewProject,
            LogType::DataNewFolder,
            LogType::DataNewItem,
            LogType::DataUpload,
            LogType::DataUpdateEntity,
            LogType::DataDownload,
        ];
        for tag in tags {
            assert_eq!(tag.as_str().len(), 6, "{:?}", tag);
        }
    }
}
