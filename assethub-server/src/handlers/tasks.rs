//! Task queue endpoints
//!
//! Enqueue, clear, claim, complete and inspect tasks. The worker secret is
//! only ever logged at database level, never to the console.

use crate::handlers::json_reply;
use crate::AppState;
use assethub_core::db::tasks;
use assethub_core::error::Result;
use assethub_core::protocol::{
    parse_request, Header, TaskClearReply, TaskClearRequest, TaskHandleReply, TaskHandleRequest,
    TaskNewReply, TaskNewRequest, TaskStatusReply, TaskUpdateReply, TaskUpdateRequest,
    PROTOCOL_TASK_CLEAR, PROTOCOL_TASK_HANDLE, PROTOCOL_TASK_NEW, PROTOCOL_TASK_STATUS,
    PROTOCOL_TASK_UPDATE,
};
use assethub_core::session::{LogLevel, LogType, Session};
use assethub_core::util::{match_root, match_uuid_path};
use axum::http::Method;
use axum::response::Response;
use rusqlite::Connection;
use std::collections::HashMap;

/// Dispatch the `tasks/*` URL space. Returns `Ok(None)` when no endpoint
/// matches.
pub fn handle(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Result<Option<Response>> {
    if method == Method::POST {
        if match_root(path, "tasks/new", true) {
            return task_new(state, session, conn, body).map(Some);
        }
        if match_root(path, "tasks/clear", true) {
            return task_clear(state, session, conn, body).map(Some);
        }
        if match_root(path, "tasks/handle", true) {
            return task_handle(state, session, conn, body).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "tasks", "") {
            return task_update(state, session, conn, &uuid, body).map(Some);
        }
    }

    if method == Method::GET {
        if let Some(uuid) = match_uuid_path(path, "tasks", "") {
            return task_status(state, session, conn, &uuid).map(Some);
        }
    }

    Ok(None)
}

fn task_new(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    body: &[u8],
) -> Result<Response> {
    let request: TaskNewRequest = parse_request(body, PROTOCOL_TASK_NEW)?;

    let uuid = tasks::create_task(conn, &request.name, &request.parameters)?;

    state.session_log.log(
        session,
        &format!("Created new task {}", uuid),
        LogType::TaskNew,
        LogLevel::Console,
    );
    state.session_log.log(
        session,
        &format!("  Parameters: {}", serde_json::to_string(&request.parameters)?),
        LogType::TaskNew,
        LogLevel::DbOnly,
    );

    Ok(json_reply(&TaskNewReply {
        header: Header::new(PROTOCOL_TASK_NEW),
        uuid,
    }))
}

fn task_clear(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    body: &[u8],
) -> Result<Response> {
    let _request: TaskClearRequest = parse_request(body, PROTOCOL_TASK_CLEAR)?;

    state.session_log.log(
        session,
        "Clearing all open tasks",
        LogType::TaskClear,
        LogLevel::Console,
    );

    let count = tasks::clear_tasks(conn)?;

    Ok(json_reply(&TaskClearReply {
        header: Header::new(PROTOCOL_TASK_CLEAR),
        count,
    }))
}

fn task_handle(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    body: &[u8],
) -> Result<Response> {
    let request: TaskHandleRequest = parse_request(body, PROTOCOL_TASK_HANDLE)?;

    state.session_log.log(
        session,
        &format!("Task name: {}, worker: {}", request.name, request.worker),
        LogType::TaskHandle,
        LogLevel::DbOnly,
    );

    let claim = tasks::claim_task(conn, &request.name, &request.worker)?;

    let reply = match claim {
        Some(claim) => {
            state.session_log.log(
                session,
                &format!("Task retrieved: taskname {}, uuid: {}", claim.name, claim.uuid),
                LogType::TaskHandle,
                LogLevel::Console,
            );
            TaskHandleReply {
                header: Header::new(PROTOCOL_TASK_HANDLE),
                uuid: claim.uuid,
                worker_secret: claim.worker_secret,
                name: claim.name,
                parameters: claim.parameters,
            }
        }
        None => {
            state.session_log.log(
                session,
                "  no task in queue",
                LogType::TaskHandle,
                LogLevel::DbOnly,
            );
            TaskHandleReply {
                header: Header::new(PROTOCOL_TASK_HANDLE),
                uuid: String::new(),
                worker_secret: String::new(),
                name: request.name,
                parameters: HashMap::new(),
            }
        }
    };

    Ok(json_reply(&reply))
}

fn task_update(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    uuid: &str,
    body: &[u8],
) -> Result<Response> {
    let request: TaskUpdateRequest = parse_request(body, PROTOCOL_TASK_UPDATE)?;

    state.session_log.log(
        session,
        &format!("Updating task {} to status {}", uuid, request.status),
        LogType::TaskUpdate,
        LogLevel::Console,
    );
    state.session_log.log(
        session,
        &format!("  Worker secret: {}", request.worker_secret),
        LogType::TaskUpdate,
        LogLevel::DbOnly,
    );

    tasks::update_task(
        conn,
        uuid,
        &request.status,
        &request.worker_secret,
        &request.results,
    )?;

    Ok(json_reply(&TaskUpdateReply {
        header: Header::new(PROTOCOL_TASK_UPDATE),
        uuid: uuid.to_string(),
    }))
}

fn task_status(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    uuid: &str,
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Retrieving status of task {}", uuid),
        LogType::TaskStatus,
        LogLevel::Console,
    );

    let record = tasks::task_status(conn, uuid)?;

    Ok(json_reply(&TaskStatusReply {
        header: Header::new(PROTOCOL_TASK_STATUS),
        uuid: record.uuid,
        status: record.status,
        name: record.name,
        parameters: record.parameters,
        result: record.result,
        worker: record.worker,
        timestamp: record.timestamp,
    }))
}
