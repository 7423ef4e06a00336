//! Schema-governed generic record engine
//!
//! A dynamic tabular layer over the main database. A JSON descriptor
//! loaded at startup constrains every identifier that can appear on the
//! wire; the engine synthesises parameterised SQL against the described
//! tables and supports soft delete plus versioned updates with automatic
//! archival of superseded rows.
//!
//! Identifiers are the only input that ends up in SQL text, which makes
//! the `^[A-Z_]+$` check load-bearing against injection. Values are always
//! bound.

pub mod engine;
pub mod schema;

pub use engine::{demarshal_value, marshal_value};
pub use schema::{check_identifier, OrmSchema, OrmType, OrmValue, TableMapping};
