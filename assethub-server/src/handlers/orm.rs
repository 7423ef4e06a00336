//! ORM endpoints
//!
//! Thin glue over the engine: parse the envelope, run the synthesised
//! statement, wrap the reply. All identifier validation happens inside the
//! engine before any SQL is assembled.

use crate::handlers::json_reply;
use crate::AppState;
use assethub_core::error::Result;
use assethub_core::orm::engine;
use assethub_core::protocol::{
    parse_request, Header, OrmDeleteReply, OrmDeleteRequest, OrmReadReply, OrmReadRequest,
    OrmSaveReply, OrmSaveRequest, OrmUpdateReply, OrmUpdateRequest, PROTOCOL_ORM_DELETE,
    PROTOCOL_ORM_READ, PROTOCOL_ORM_SAVE, PROTOCOL_ORM_UPDATE,
};
use assethub_core::session::{LogLevel, LogType, Session};
use assethub_core::util::match_root;
use axum::http::Method;
use axum::response::Response;
use rusqlite::Connection;

/// Dispatch the `orm/*` URL space. Returns `Ok(None)` when no endpoint
/// matches.
pub fn handle(
    state: &AppState,
    session: &Session,
    conn: &mut Connection,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Result<Option<Response>> {
    if method != Method::POST {
        return Ok(None);
    }

    if match_root(path, "orm/read", true) {
        return read(state, session, conn, body).map(Some);
    }
    if match_root(path, "orm/save", true) {
        return save(state, session, conn, body).map(Some);
    }
    if match_root(path, "orm/delete", true) {
        return delete(state, session, conn, body).map(Some);
    }
    if match_root(path, "orm/update", true) {
        return update(state, session, conn, body).map(Some);
    }

    Ok(None)
}

fn read(state: &AppState, session: &Session, conn: &Connection, body: &[u8]) -> Result<Response> {
    let request: OrmReadRequest = parse_request(body, PROTOCOL_ORM_READ)?;

    state.session_log.log(
        session,
        &format!("Read request entity: {}", request.entity),
        LogType::OrmRead,
        LogLevel::Console,
    );

    let (columns, rows) = engine::read(conn, &state.orm, &request)?;

    Ok(json_reply(&OrmReadReply {
        header: Header::new(PROTOCOL_ORM_READ),
        columns,
        rows,
    }))
}

fn save(state: &AppState, session: &Session, conn: &Connection, body: &[u8]) -> Result<Response> {
    let request: OrmSaveRequest = parse_request(body, PROTOCOL_ORM_SAVE)?;

    state.session_log.log(
        session,
        &format!("Save request entity: {}", request.entity),
        LogType::OrmSave,
        LogLevel::Console,
    );

    engine::save(conn, &state.orm, &request)?;

    Ok(json_reply(&OrmSaveReply {
        header: Header::new(PROTOCOL_ORM_SAVE),
    }))
}

fn delete(state: &AppState, session: &Session, conn: &Connection, body: &[u8]) -> Result<Response> {
    let request: OrmDeleteRequest = parse_request(body, PROTOCOL_ORM_DELETE)?;

    state.session_log.log(
        session,
        &format!("Delete request entity: {}", request.entity),
        LogType::OrmDelete,
        LogLevel::Console,
    );

    engine::delete(conn, &state.orm, &request)?;

    Ok(json_reply(&OrmDeleteReply {
        header: Header::new(PROTOCOL_ORM_DELETE),
    }))
}

fn update(
    state: &AppState,
    session: &Session,
    conn: &mut Connection,
    body: &[u8],
) -> Result<Response> {
    let request: OrmUpdateRequest = parse_request(body, PROTOCOL_ORM_UPDATE)?;

    state.session_log.log(
        session,
        &format!("Update request entity: {}", request.entity),
        LogType::OrmUpdate,
        LogLevel::Console,
    );

    engine::update(conn, &state.orm, &request)?;

    Ok(json_reply(&OrmUpdateReply {
        header: Header::new(PROTOCOL_ORM_UPDATE),
    }))
}
