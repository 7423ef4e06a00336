//! Session and authentication core
//!
//! This module provides:
//! - The per-process session log database (timestamped file, single
//!   serialised connection)
//! - The salted-challenge handshake that issues bearer tokens
//! - Token-to-session resolution with expiry

pub mod auth;
pub mod log;

pub use auth::{
    accept_session, challenge_key, create_session, hashed_salt, session_by_token,
    user_for_session, verify_challenge, AUTH_TYPE,
};
pub use log::{LogLevel, LogType, Session, SessionLog};
