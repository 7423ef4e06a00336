//! Error types for assethub-core

use thiserror::Error;

/// Main error type for the assethub-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Timestamp parsing error
    #[error("timestamp error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Protocol envelope error
    #[error("{0}")]
    Protocol(String),

    /// Request validation error
    #[error("{0}")]
    Validation(String),

    /// Authentication error
    #[error("{0}")]
    Auth(String),

    /// A referenced resource does not exist
    #[error("{kind} not found: {uuid}")]
    NotFound {
        /// Resource kind ("hub", "folder", "entity", ...)
        kind: &'static str,
        /// The uuid that failed to resolve
        uuid: String,
    },

    /// Task worker client error
    #[error("worker error: {0}")]
    Worker(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] with an owned uuid.
    pub fn not_found(kind: &'static str, uuid: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            uuid: uuid.into(),
        }
    }
}

/// Result type alias for assethub-core
pub type Result<T> = std::result::Result<T, Error>;
