//! Endpoint handlers
//!
//! Each submodule owns one slice of the URL space and follows the same
//! shape: parse the envelope, call into the core, wrap the reply. Errors
//! bubble to the dispatcher, which turns them into the uniform error
//! envelope.

pub mod data;
pub mod orm;
pub mod session;
pub mod tasks;

use assethub_core::protocol::{ErrorReply, Header, PROTOCOL_ERROR};
use assethub_core::util::new_uuid;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The uniform error reply: HTTP 500 with the error envelope.
pub fn error_reply(message: &str) -> Response {
    let reply = ErrorReply {
        header: Header::new(PROTOCOL_ERROR),
        error_message: message.to_string(),
        log_uuid: new_uuid(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(reply)).into_response()
}

/// A successful JSON reply.
pub fn json_reply<T: Serialize>(reply: &T) -> Response {
    Json(reply).into_response()
}
