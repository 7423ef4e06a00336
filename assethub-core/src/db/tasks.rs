//! Task queue
//!
//! A single-queue, pull-based work queue with at-most-one assignment. A
//! claim stamps the chosen row with a fresh transaction uuid that doubles
//! as the worker secret; completion must present that exact secret. There
//! is no visibility timeout: a crashed worker leaves its task INPROCESS
//! until it is explicitly handed back.

use crate::error::{Error, Result};
use crate::types::{TaskRecord, TaskState};
use crate::util::new_uuid;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;

/// A task handed to a worker by a successful claim.
#[derive(Debug, Clone)]
pub struct ClaimedTask {
    /// Task identifier
    pub uuid: String,
    /// Task name
    pub name: String,
    /// Caller-supplied parameters
    pub parameters: HashMap<String, String>,
    /// Secret the worker must present on completion
    pub worker_secret: String,
}

fn parse_string_map(raw: &str) -> Result<HashMap<String, String>> {
    if raw.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(serde_json::from_str(raw)?)
}

/// Enqueue a task in status NEW and return its uuid.
pub fn create_task(
    conn: &Connection,
    name: &str,
    parameters: &HashMap<String, String>,
) -> Result<String> {
    if name.is_empty() {
        return Err(Error::Validation("invalid task name".to_string()));
    }

    let uuid = new_uuid();
    let parameters = serde_json::to_string(parameters)?;
    let timestamp = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO netstorage_tasks (uuid, taskname, status, parameters, timestamp, transactionuuid)
         VALUES (?1, ?2, ?3, ?4, ?5, ?1)",
        params![uuid, name, TaskState::New.as_str(), parameters, timestamp],
    )?;

    Ok(uuid)
}

/// Cancel every task still in status NEW; returns the number of rows
/// affected. Cancelled rows get a fresh transaction uuid so no stale
/// claim read-back can match them.
pub fn clear_tasks(conn: &Connection) -> Result<i64> {
    let transaction_uuid = new_uuid();
    let count = conn.execute(
        "UPDATE netstorage_tasks SET status=?1, transactionuuid=?2 WHERE status=?3",
        params![
            TaskState::Canceled.as_str(),
            transaction_uuid,
            TaskState::New.as_str()
        ],
    )?;
    Ok(count as i64)
}

/// Claim the most recent NEW or RETURNED task for a name.
///
/// Two statements: a conditional update stamping a fresh transaction uuid
/// (which doubles as the worker secret), then a select by that uuid. Zero
/// rows means the queue was empty; more than one means a transaction uuid
/// was reused and the claim protocol is broken.
pub fn claim_task(conn: &Connection, name: &str, worker: &str) -> Result<Option<ClaimedTask>> {
    if name.is_empty() {
        return Err(Error::Validation("invalid task name".to_string()));
    }

    let transaction_uuid = new_uuid();

    conn.execute(
        "UPDATE netstorage_tasks SET status=?1, transactionuuid=?2, worker=?3, workersecret=?2
         WHERE uuid IN (
             SELECT uuid FROM netstorage_tasks
             WHERE (status=?4 OR status=?5) AND taskname=?6
             ORDER BY timestamp DESC LIMIT 1
         )",
        params![
            TaskState::Inprocess.as_str(),
            transaction_uuid,
            worker,
            TaskState::New.as_str(),
            TaskState::Returned.as_str(),
            name
        ],
    )?;

    let mut stmt = conn.prepare(
        "SELECT uuid, taskname, parameters FROM netstorage_tasks WHERE transactionuuid=?1",
    )?;
    let locked = stmt
        .query_map([&transaction_uuid], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    match locked.as_slice() {
        [] => Ok(None),
        [(uuid, task_name, parameters)] => Ok(Some(ClaimedTask {
            uuid: uuid.clone(),
            name: task_name.clone(),
            parameters: parse_string_map(parameters)?,
            worker_secret: transaction_uuid,
        })),
        _ => Err(Error::Validation(
            "Duplicate tasks locked in request!".to_string(),
        )),
    }
}

/// Complete an INPROCESS task, guarded by its worker secret.
///
/// The update is conditional on `(uuid, INPROCESS, workersecret)`; the new
/// transaction uuid is then read back to verify the row was actually hit.
pub fn update_task(
    conn: &Connection,
    uuid: &str,
    status: &str,
    worker_secret: &str,
    results: &HashMap<String, String>,
) -> Result<()> {
    let state: TaskState = status.parse().map_err(Error::Validation)?;
    if !state.is_terminal() {
        return Err(Error::Validation(format!("Invalid status string: {}", status)));
    }

    let transaction_uuid = new_uuid();
    let result_json = serde_json::to_string(results)?;

    conn.execute(
        "UPDATE netstorage_tasks SET status=?1, transactionuuid=?2, taskresult=?3
         WHERE uuid=?4 AND status=?5 AND workersecret=?6",
        params![
            state.as_str(),
            transaction_uuid,
            result_json,
            uuid,
            TaskState::Inprocess.as_str(),
            worker_secret
        ],
    )?;

    let found: Option<String> = conn
        .query_row(
            "SELECT transactionuuid FROM netstorage_tasks WHERE uuid=?1",
            [uuid],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        None => Err(Error::not_found("task", uuid)),
        Some(stamped) if stamped == transaction_uuid => Ok(()),
        Some(_) => Err(Error::Validation(format!("could not update task: {}", uuid))),
    }
}

/// Report a task's current state.
pub fn task_status(conn: &Connection, uuid: &str) -> Result<TaskRecord> {
    let row: Option<(String, String, String, String, String, String)> = conn
        .query_row(
            "SELECT taskname, status, parameters, timestamp, worker, taskresult
             FROM netstorage_tasks WHERE uuid=?1",
            [uuid],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;

    let (name, status, parameters, timestamp, worker, result) =
        row.ok_or_else(|| Error::not_found("task", uuid))?;

    Ok(TaskRecord {
        uuid: uuid.to_string(),
        name,
        status,
        parameters: parse_string_map(&parameters)?,
        result: parse_string_map(&result)?,
        worker,
        timestamp,
    })
}
