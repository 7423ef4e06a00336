//! Session handshake endpoints
//!
//! Both endpoints are unauthenticated: `session/new` opens the handshake
//! and returns the hashed salt, `session/auth` verifies the challenge
//! response and releases the bearer token.

use crate::handlers::{error_reply, json_reply};
use crate::AppState;
use assethub_core::error::{Error, Result};
use assethub_core::protocol::{
    parse_request, AuthenticateSessionReply, AuthenticateSessionRequest, CreateSessionReply,
    CreateSessionRequest, Header, PROTOCOL_SESSION_AUTH, PROTOCOL_SESSION_NEW,
};
use assethub_core::session::{
    accept_session, challenge_key, create_session, hashed_salt, user_for_session,
    verify_challenge, LogLevel, LogType, AUTH_TYPE,
};
use assethub_core::util::canonical_uuid;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

/// Dispatch the `session/*` URL space.
pub fn handle(state: &AppState, method: &Method, path: &str, body: &[u8]) -> Response {
    use assethub_core::util::match_root;

    if method == Method::POST {
        if match_root(path, "session/new", true) {
            return session_new(state, body).unwrap_or_else(|err| error_reply(&err.to_string()));
        }
        if match_root(path, "session/auth", true) {
            return session_auth(state, body).unwrap_or_else(|err| error_reply(&err.to_string()));
        }
    }

    StatusCode::NOT_FOUND.into_response()
}

fn session_new(state: &AppState, body: &[u8]) -> Result<Response> {
    let request: CreateSessionRequest = parse_request(body, PROTOCOL_SESSION_NEW)?;

    let session = create_session(&state.session_log, &request.user_id)?;

    state.session_log.log(
        &session,
        &format!("Created session for user \"{}\"..", request.user_id),
        LogType::System,
        LogLevel::Console,
    );

    let (_, salt) = state
        .config
        .authentication
        .credentials_for(&request.user_id);

    Ok(json_reply(&CreateSessionReply {
        header: Header::new(PROTOCOL_SESSION_NEW),
        session_uuid: session.uuid,
        auth_type: AUTH_TYPE.to_string(),
        user_id: request.user_id,
        salt: hashed_salt(salt),
    }))
}

fn session_auth(state: &AppState, body: &[u8]) -> Result<Response> {
    let request: AuthenticateSessionRequest = parse_request(body, PROTOCOL_SESSION_AUTH)?;

    if state.config.authentication.auth_type != "passphrase" {
        return Err(Error::Auth("unknown authentication method".to_string()));
    }
    if request.auth_type != AUTH_TYPE {
        return Err(Error::Auth("invalid authentication method".to_string()));
    }

    let session_uuid = canonical_uuid(&request.session_uuid)?;

    let user_id = user_for_session(&state.session_log, &session_uuid)?;
    let (passphrase, _) = state.config.authentication.credentials_for(&user_id);

    let expected = challenge_key(&session_uuid, passphrase);
    if !verify_challenge(&expected, &request.auth_key) {
        return Err(Error::Auth(
            "authentication failed - invalid connection key".to_string(),
        ));
    }

    let token = accept_session(&state.session_log, &session_uuid)?;

    Ok(json_reply(&AuthenticateSessionReply {
        header: Header::new(PROTOCOL_SESSION_AUTH),
        session_uuid: request.session_uuid,
        token,
    }))
}
