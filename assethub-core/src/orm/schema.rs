//! ORM schema descriptor
//!
//! The descriptor is a JSON document carrying a `schema` tag, the protocol
//! version, and a list of table mappings. It is loaded once at startup and
//! read-only afterwards.

use crate::error::{Error, Result};
use crate::protocol::{PROTOCOL_ORM_SCHEMA, PROTOCOL_VERSION};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Z_]+$").expect("invalid regex"));

/// The single validator for schema and column identifiers. Anything that
/// fails this check must never be interpolated into SQL text.
pub fn check_identifier(identifier: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(identifier)
}

/// Column types the engine can marshal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrmType {
    Integer,
    Varchar,
    Boolean,
    Datetime,
    Uuid,
    Blob,
}

impl OrmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrmType::Integer => "integer",
            OrmType::Varchar => "varchar",
            OrmType::Boolean => "boolean",
            OrmType::Datetime => "datetime",
            OrmType::Uuid => "uuid",
            OrmType::Blob => "blob",
        }
    }
}

/// A keyed, typed value as it travels on the wire. The wire-supplied type
/// is the serialisation hint for marshalling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrmValue {
    /// Column name; must satisfy the identifier check
    pub key: String,
    /// Serialisation type
    #[serde(rename = "type")]
    pub value_type: OrmType,
    /// Textual value (base64 for blobs)
    #[serde(default)]
    pub value: String,
    /// Unique-column marker carried by schema descriptors
    #[serde(default)]
    pub unique: bool,
}

#[derive(Debug, Deserialize)]
struct SchemaDescriptor {
    schema: String,
    version: String,
    mappings: Vec<MappingDescriptor>,
}

#[derive(Debug, Deserialize)]
struct MappingDescriptor {
    name: String,
    #[serde(rename = "primarykey", default)]
    primary_key: String,
    fields: Vec<OrmValue>,
}

/// A validated table mapping. Field order follows the descriptor so the
/// synthesised archive column list is deterministic.
#[derive(Debug, Clone)]
pub struct TableMapping {
    /// Table name
    pub name: String,
    /// Primary key column
    pub primary_key: String,
    field_order: Vec<String>,
    field_types: HashMap<String, OrmType>,
}

impl TableMapping {
    /// Declared field keys, in descriptor order.
    pub fn field_keys(&self) -> &[String] {
        &self.field_order
    }

    /// Type of a declared key, if any.
    pub fn key_type(&self, key: &str) -> Option<OrmType> {
        self.field_types.get(key).copied()
    }

    /// Validate a wire-supplied key against the identifier pattern and the
    /// mapping, returning its declared type.
    pub fn require_key(&self, key: &str) -> Result<OrmType> {
        if !check_identifier(key) {
            return Err(Error::Validation(format!("Invalid Key Name: {}", key)));
        }
        self.key_type(key)
            .ok_or_else(|| Error::Validation(format!("invalid ORM key: {}", key)))
    }
}

/// The loaded, read-only schema table.
#[derive(Debug, Clone, Default)]
pub struct OrmSchema {
    tables: HashMap<String, TableMapping>,
}

impl OrmSchema {
    /// Load and validate a descriptor file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a descriptor from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptor: SchemaDescriptor = serde_json::from_str(json)?;

        if descriptor.schema != PROTOCOL_ORM_SCHEMA {
            return Err(Error::Config(format!(
                "Invalid ORM Schema Type: {}",
                descriptor.schema
            )));
        }
        if descriptor.version != PROTOCOL_VERSION {
            return Err(Error::Config(format!(
                "Invalid ORM Schema Version: {}",
                descriptor.version
            )));
        }

        let mut tables = HashMap::new();
        for mapping in descriptor.mappings {
            if !check_identifier(&mapping.name) {
                return Err(Error::Validation(format!(
                    "Invalid Mapping Name: {}",
                    mapping.name
                )));
            }

            let mut field_order = Vec::with_capacity(mapping.fields.len());
            let mut field_types = HashMap::with_capacity(mapping.fields.len());
            for field in &mapping.fields {
                if !check_identifier(&field.key) {
                    return Err(Error::Validation(format!(
                        "Invalid Mapping Key: {}",
                        field.key
                    )));
                }
                field_order.push(field.key.clone());
                field_types.insert(field.key.clone(), field.value_type);
            }

            tables.insert(
                mapping.name.clone(),
                TableMapping {
                    name: mapping.name,
                    primary_key: mapping.primary_key,
                    field_order,
                    field_types,
                },
            );
        }

        Ok(Self { tables })
    }

    /// Number of loaded table mappings.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// True when no mappings are loaded.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Validate a wire-supplied entity name and resolve its mapping.
    pub fn mapping(&self, entity: &str) -> Result<&TableMapping> {
        if !check_identifier(entity) {
            return Err(Error::Validation(format!("Invalid Mapping Name: {}", entity)));
        }
        self.tables
            .get(entity)
            .ok_or_else(|| Error::Validation(format!("invalid ORM entity: {}", entity)))
    }
}
