//! # assethub-core
//!
//! Core library for assethub - a self-hosted application server holding a
//! hierarchical corpus of binary assets with a schema-governed record
//! store and a pull-based task queue on top of the same database.
//!
//! This library provides:
//! - The salted-challenge session core and its per-process log database
//! - The asset DAG store (hub → project → folder → item → entity) with
//!   content-addressed blobs on local disk
//! - The schema-governed ORM engine with soft delete and versioned
//!   updates
//! - The task dispatch queue and a matching worker client
//! - Configuration, logging and wire-protocol plumbing
//!
//! ## Architecture
//!
//! Two SQLite databases back the server: a fresh timestamped session log
//! database per process (single serialised connection, shared by every
//! handler) and a long-lived main database opened fresh per request.
//! Entity payloads live next to the main database as `<uuid>.dat` files.
//!
//! ## Example
//!
//! ```rust,no_run
//! use assethub_core::{Config, SessionLog};
//! use std::path::Path;
//!
//! let config = Config::load_from(Path::new("assethub.toml")).expect("failed to load config");
//! let log = SessionLog::create(&config.log.prefix).expect("failed to create session log");
//! let conn = assethub_core::db::open(&config.database.db_type, &config.database.filename)
//!     .expect("failed to open database");
//! # let _ = conn;
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use orm::OrmSchema;
pub use session::{Session, SessionLog};
pub use types::*;

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod orm;
pub mod protocol;
pub mod session;
pub mod types;
pub mod util;
pub mod worker;
