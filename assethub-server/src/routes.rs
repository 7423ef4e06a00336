//! Request dispatch
//!
//! The protocol's URL space predates path-template routing, so a single
//! dispatcher walks it with the shared URL matchers: `session/*` first
//! (unauthenticated), then bearer resolution, then the business paths.

use crate::handlers::{self, error_reply};
use crate::AppState;
use assethub_core::db;
use assethub_core::session::{session_by_token, LogLevel, LogType, Session};
use assethub_core::util::match_prefix;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

async fn collect_body(request: Request) -> Result<(Method, String, Bytes), Response> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|err| error_reply(&format!("failed to read request body: {}", err)))?;

    Ok((parts.method, path, bytes))
}

/// Handle one request against the protocol URL space.
pub async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let (method, path, body) = match collect_body(request).await {
        Ok(collected) => collected,
        Err(response) => return response,
    };

    // Session endpoints authenticate themselves
    if match_prefix(&path, "session/") {
        return handlers::session::handle(&state, &method, &path, &body);
    }

    if auth_header.len() < 8 {
        return (
            StatusCode::NETWORK_AUTHENTICATION_REQUIRED,
            "Invalid authorization header",
        )
            .into_response();
    }
    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return (
            StatusCode::NETWORK_AUTHENTICATION_REQUIRED,
            "Invalid authorization token",
        )
            .into_response();
    };

    let session = match session_by_token(
        &state.session_log,
        token,
        state.config.authentication.session_duration,
    ) {
        Ok(session) => session,
        Err(err) => {
            let session = Session::empty();
            state.session_log.log(
                &session,
                &format!("Session Error: {}", path),
                LogType::System,
                LogLevel::Console,
            );
            tracing::warn!(error = %err, path = %path, "could not authenticate request");
            return (StatusCode::FORBIDDEN, "could not authenticate").into_response();
        }
    };

    state.session_log.log(
        &session,
        &format!("Retrieved request: {}", path),
        LogType::System,
        LogLevel::DbOnly,
    );

    let mut conn = match db::open(
        &state.config.database.db_type,
        &state.config.database.filename,
    ) {
        Ok(conn) => conn,
        Err(err) => {
            tracing::error!(error = %err, "could not open main database");
            return error_reply("Could not open Database.");
        }
    };

    let handled = if match_prefix(&path, "data/") {
        handlers::data::handle(&state, &session, &mut conn, &method, &path, &body)
    } else if match_prefix(&path, "orm/") {
        handlers::orm::handle(&state, &session, &mut conn, &method, &path, &body)
    } else if match_prefix(&path, "tasks/") {
        handlers::tasks::handle(&state, &session, &conn, &method, &path, &body)
    } else {
        Ok(None)
    };

    match handled {
        Ok(Some(response)) => response,
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::warn!(error = %err, path = %path, "request failed");
            error_reply(&err.to_string())
        }
    }
}
