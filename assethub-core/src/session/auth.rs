//! Salted-challenge session authentication
//!
//! The handshake is a classical challenge-response over SHA-1 of a
//! domain-separated concatenation:
//! `hex(SHA1("NETFABB" + session_uuid + passphrase))`. SHA-1 and the fixed
//! prefix are preserved bit-exact for wire compatibility with existing
//! clients; this is a compatibility contract, not a recommendation.
//!
//! The bearer token is `base64(JSON{session, userid})` and is not
//! cryptographically bound to the session beyond the lookup table.

use crate::error::{Error, Result};
use crate::session::log::{Session, SessionLog};
use crate::util::{is_valid_user_id, new_uuid};
use base64::Engine;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// The only supported handshake scheme.
pub const AUTH_TYPE: &str = "saltedhash";

const CHALLENGE_PREFIX: &str = "NETFABB";

const STATUS_NEW: &str = "NEW";
const STATUS_ACCEPTED: &str = "ACCEPTED";

#[derive(Serialize, Deserialize)]
struct TokenPayload {
    #[serde(rename = "session")]
    session_uuid: String,
    #[serde(rename = "userid")]
    user_id: String,
}

/// Hex SHA-1 of the configured salt; an empty salt yields an empty string
/// (preserved back-compat quirk).
pub fn hashed_salt(salt: &str) -> String {
    if salt.is_empty() {
        return String::new();
    }
    hex::encode(Sha1::digest(salt.as_bytes()))
}

/// The challenge key a client must present for a session.
pub fn challenge_key(session_uuid: &str, passphrase: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(CHALLENGE_PREFIX.as_bytes());
    hasher.update(session_uuid.as_bytes());
    hasher.update(passphrase.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a presented auth key against the expected challenge key.
pub fn verify_challenge(expected: &str, supplied: &str) -> bool {
    expected == supplied.trim().to_lowercase()
}

/// Create a session in status NEW and mint its bearer token.
pub fn create_session(log: &SessionLog, user_id: &str) -> Result<Session> {
    if !is_valid_user_id(user_id) {
        return Err(Error::Validation(
            "user id contains invalid characters".to_string(),
        ));
    }

    let session_uuid = new_uuid();

    let payload = TokenPayload {
        session_uuid: session_uuid.clone(),
        user_id: user_id.to_string(),
    };
    let token =
        base64::engine::general_purpose::STANDARD.encode(serde_json::to_vec(&payload)?);

    let timestamp = Utc::now().to_rfc3339();

    let conn = log.connection();
    conn.execute(
        "INSERT INTO sessions (sessionuuid, userid, token, status, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![session_uuid, user_id, token, STATUS_NEW, timestamp],
    )?;
    drop(conn);

    let mut session = Session::empty();
    session.uuid = session_uuid;
    session.user_id = user_id.to_string();
    session.token = token;
    Ok(session)
}

/// Look up the user id bound to a session uuid.
pub fn user_for_session(log: &SessionLog, session_uuid: &str) -> Result<String> {
    let conn = log.connection();
    conn.query_row(
        "SELECT userid FROM sessions WHERE sessionuuid=?1",
        [session_uuid],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::Auth(format!("invalid session uuid: {}", session_uuid)))
}

/// Move a session from NEW to ACCEPTED and return its bearer token.
pub fn accept_session(log: &SessionLog, session_uuid: &str) -> Result<String> {
    let conn = log.connection();
    conn.execute(
        "UPDATE sessions SET status=?1 WHERE sessionuuid=?2 AND status=?3",
        params![STATUS_ACCEPTED, session_uuid, STATUS_NEW],
    )?;

    conn.query_row(
        "SELECT token FROM sessions WHERE sessionuuid=?1 AND status=?2",
        params![session_uuid, STATUS_ACCEPTED],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::Auth(format!("invalid session uuid: {}", session_uuid)))
}

/// Resolve a bearer token to a live session.
///
/// The session must be ACCEPTED and younger than `max_duration_secs`;
/// a creation time in the future is rejected as clock skew.
pub fn session_by_token(log: &SessionLog, token: &str, max_duration_secs: i64) -> Result<Session> {
    let conn = log.connection();
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT sessionuuid, userid, timestamp FROM sessions WHERE token=?1 AND status=?2",
            params![token, STATUS_ACCEPTED],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    drop(conn);

    let (session_uuid, user_id, timestamp) =
        row.ok_or_else(|| Error::Auth("invalid session token".to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&timestamp)?;
    let elapsed = Utc::now().signed_duration_since(created_at);

    if elapsed < chrono::Duration::zero() {
        return Err(Error::Auth("invalid session time".to_string()));
    }

    if elapsed.num_seconds() >= max_duration_secs {
        return Err(Error::Auth("session expired".to_string()));
    }

    Ok(Session::resolved(session_uuid, user_id, token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashed_salt() {
        // hex(SHA1("s1"))
        assert_eq!(hashed_salt("s1"), "640d87e741e6aa4c669a82a4cd304787960513ab");
        assert_eq!(hashed_salt(""), "");
    }

    #[test]
    fn test_challenge_key_matches_concatenated_digest() {
        let uuid = "d96bc3b5-235d-4fb9-87e9-2260e312e20c";
        let direct = hex::encode(Sha1::digest(
            format!("{}{}{}", "NETFABB", uuid, "pw").as_bytes(),
        ));
        assert_eq!(challenge_key(uuid, "pw"), direct);
    }

    #[test]
    fn test_verify_challenge_trims_and_lowercases() {
        let key = challenge_key("d96bc3b5-235d-4fb9-87e9-2260e312e20c", "pw");
        assert!(verify_challenge(&key, &format!("  {}  ", key.to_uppercase())));
        assert!(!verify_challenge(&key, "deadbeef"));
    }

    #[test]
    fn test_create_session_rejects_invalid_user() {
        let log = SessionLog::open_in_memory().unwrap();
        assert!(create_session(&log, "").is_err());
        assert!(create_session(&log, "alice bob").is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let log = SessionLog::open_in_memory().unwrap();

        let session = create_session(&log, "alice").unwrap();
        assert!(!session.token.is_empty());

        // A NEW session does not resolve by token
        assert!(session_by_token(&log, &session.token, 3600).is_err());

        assert_eq!(user_for_session(&log, &session.uuid).unwrap(), "alice");

        let token = accept_session(&log, &session.uuid).unwrap();
        assert_eq!(token, session.token);

        let resolved = session_by_token(&log, &token, 3600).unwrap();
        assert!(resolved.active);
        assert_eq!(resolved.uuid, session.uuid);
        assert_eq!(resolved.user_id, "alice");
    }

    #[test]
    fn test_token_is_base64_json() {
        let log = SessionLog::open_in_memory().unwrap();
        let session = create_session(&log, "alice").unwrap();

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&session.token)
            .unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(payload["session"], session.uuid);
        assert_eq!(payload["userid"], "alice");
    }

    fn rewrite_timestamp(log: &SessionLog, session_uuid: &str, timestamp: &str) {
        log.connection()
            .execute(
                "UPDATE sessions SET timestamp=?1 WHERE sessionuuid=?2",
                params![timestamp, session_uuid],
            )
            .unwrap();
    }

    #[test]
    fn test_session_expiry_boundaries() {
        let log = SessionLog::open_in_memory().unwrap();
        let session = create_session(&log, "alice").unwrap();
        accept_session(&log, &session.uuid).unwrap();

        // Exactly as old as the window: rejected
        let at_limit = (Utc::now() - chrono::Duration::seconds(3600)).to_rfc3339();
        rewrite_timestamp(&log, &session.uuid, &at_limit);
        assert!(session_by_token(&log, &session.token, 3600).is_err());

        // One second younger than the window: accepted
        let inside = (Utc::now() - chrono::Duration::seconds(3599)).to_rfc3339();
        rewrite_timestamp(&log, &session.uuid, &inside);
        assert!(session_by_token(&log, &session.token, 3600).is_ok());

        // Created in the future: clock-skew guard
        let future = (Utc::now() + chrono::Duration::seconds(60)).to_rfc3339();
        rewrite_timestamp(&log, &session.uuid, &future);
        assert!(session_by_token(&log, &session.token, 3600).is_err());
    }
}
