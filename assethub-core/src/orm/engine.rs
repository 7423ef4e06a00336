//! SQL synthesis and value marshalling
//!
//! Every statement is built from validated identifiers plus `?`
//! placeholders; the filter and value lists share one ordered parameter
//! vector bound in emission order.

use crate::error::{Error, Result};
use crate::orm::schema::{OrmSchema, OrmType, OrmValue, TableMapping};
use crate::protocol::{OrmDeleteRequest, OrmReadRequest, OrmSaveRequest, OrmUpdateRequest};
use base64::Engine;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};

/// Convert a wire value into a bindable SQL parameter. Blobs are base64
/// decoded to raw bytes; everything else binds as text.
pub fn marshal_value(value: &OrmValue) -> Result<Value> {
    match value.value_type {
        OrmType::Blob => Ok(Value::Blob(
            base64::engine::general_purpose::STANDARD.decode(&value.value)?,
        )),
        _ => Ok(Value::Text(value.value.clone())),
    }
}

/// Render a stored cell back into its wire form. Blobs are base64
/// encoded; everything else is returned textually.
pub fn demarshal_value(value_type: OrmType, raw: ValueRef<'_>) -> Result<String> {
    match value_type {
        OrmType::Blob => match raw {
            ValueRef::Null => Ok(String::new()),
            ValueRef::Blob(bytes) => Ok(base64::engine::general_purpose::STANDARD.encode(bytes)),
            ValueRef::Text(bytes) => Ok(base64::engine::general_purpose::STANDARD.encode(bytes)),
            _ => Err(Error::Validation("Invalid value type".to_string())),
        },
        _ => match raw {
            ValueRef::Null => Ok(String::new()),
            ValueRef::Integer(value) => Ok(value.to_string()),
            ValueRef::Real(value) => Ok(value.to_string()),
            ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec())
                .map_err(|_| Error::Validation("Invalid value type".to_string())),
            ValueRef::Blob(_) => Err(Error::Validation("Invalid value type".to_string())),
        },
    }
}

/// Append `AND <key>=?` clauses for a filter list, collecting bindings.
fn push_filter(
    query: &mut String,
    params: &mut Vec<Value>,
    mapping: &TableMapping,
    filter: &[OrmValue],
) -> Result<()> {
    for value in filter {
        mapping.require_key(&value.key)?;
        params.push(marshal_value(value)?);
        query.push_str(" AND ");
        query.push_str(&value.key);
        query.push_str("=?");
    }
    Ok(())
}

/// Synthesise and run a read:
/// `SELECT k1, k2, … FROM <entity> WHERE SYS_ACTIVE=1 AND f1=? …`.
///
/// Returns the column list and every row rendered through the type-aware
/// demarshaller.
pub fn read(
    conn: &Connection,
    schema: &OrmSchema,
    request: &OrmReadRequest,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mapping = schema.mapping(&request.entity)?;

    let mut columns = Vec::with_capacity(request.values.len());
    let mut column_types = Vec::with_capacity(request.values.len());
    let mut query = String::from("SELECT ");
    for (index, value) in request.values.iter().enumerate() {
        let key_type = mapping.require_key(&value.key)?;
        if index > 0 {
            query.push_str(", ");
        }
        query.push_str(&value.key);
        columns.push(value.key.clone());
        column_types.push(key_type);
    }

    query.push_str(" FROM ");
    query.push_str(&mapping.name);
    query.push_str(" WHERE SYS_ACTIVE=1");

    let mut params: Vec<Value> = Vec::with_capacity(request.filter.len());
    push_filter(&mut query, &mut params, mapping, &request.filter)?;

    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query(params_from_iter(params))?;

    let mut result_rows = Vec::new();
    while let Some(row) = rows.next()? {
        let mut rendered = Vec::with_capacity(columns.len());
        for (index, key_type) in column_types.iter().enumerate() {
            rendered.push(demarshal_value(*key_type, row.get_ref(index)?)?);
        }
        result_rows.push(rendered);
    }

    Ok((columns, result_rows))
}

/// Synthesise and run an insert:
/// `INSERT INTO <entity> (k1, k2, …) VALUES (?, ?, …)`.
pub fn save(conn: &Connection, schema: &OrmSchema, request: &OrmSaveRequest) -> Result<()> {
    let mapping = schema.mapping(&request.entity)?;

    let mut query = String::from("INSERT INTO ");
    query.push_str(&mapping.name);
    query.push_str(" (");

    let mut params: Vec<Value> = Vec::with_capacity(request.values.len());
    for (index, value) in request.values.iter().enumerate() {
        mapping.require_key(&value.key)?;
        if index > 0 {
            query.push_str(", ");
        }
        query.push_str(&value.key);
        params.push(marshal_value(value)?);
    }

    query.push_str(") VALUES (");
    for index in 0..request.values.len() {
        if index > 0 {
            query.push_str(", ");
        }
        query.push('?');
    }
    query.push(')');

    conn.execute(&query, params_from_iter(params))?;
    Ok(())
}

/// Synthesise and run a soft delete:
/// `UPDATE <entity> SET SYS_ACTIVE=0 WHERE SYS_ACTIVE=1 AND f1=? …`.
pub fn delete(conn: &Connection, schema: &OrmSchema, request: &OrmDeleteRequest) -> Result<()> {
    let mapping = schema.mapping(&request.entity)?;

    let mut query = String::from("UPDATE ");
    query.push_str(&mapping.name);
    query.push_str(" SET SYS_ACTIVE=0 WHERE SYS_ACTIVE=1");

    let mut params: Vec<Value> = Vec::with_capacity(request.filter.len());
    push_filter(&mut query, &mut params, mapping, &request.filter)?;

    conn.execute(&query, params_from_iter(params))?;
    Ok(())
}

/// Copy the matching live rows into `<entity>_ARCHIVE`, preserving
/// `SYS_ACTIVE` and `SYS_VERSION`. The column list follows the descriptor
/// order.
fn copy_to_archive(
    conn: &Connection,
    mapping: &TableMapping,
    filter: &[OrmValue],
) -> Result<()> {
    let mut field_list = String::from("SYS_ACTIVE, SYS_VERSION");
    for key in mapping.field_keys() {
        field_list.push_str(", ");
        field_list.push_str(key);
    }

    let mut query = format!(
        "INSERT INTO {entity}_ARCHIVE ({fields}) SELECT {fields} FROM {entity} WHERE SYS_ACTIVE=1",
        entity = mapping.name,
        fields = field_list
    );

    let mut params: Vec<Value> = Vec::with_capacity(filter.len());
    push_filter(&mut query, &mut params, mapping, filter)?;

    conn.execute(&query, params_from_iter(params))?;
    Ok(())
}

/// Versioned update inside one transaction: archive the pre-image rows,
/// then `UPDATE <entity> SET SYS_VERSION=SYS_VERSION+1, k1=?, … WHERE
/// SYS_ACTIVE=1 AND f1=? …`. Any step failure rolls back.
pub fn update(
    conn: &mut Connection,
    schema: &OrmSchema,
    request: &OrmUpdateRequest,
) -> Result<()> {
    let mapping = schema.mapping(&request.entity)?;

    let tx = conn.transaction()?;

    copy_to_archive(&tx, mapping, &request.filter)?;

    let mut query = String::from("UPDATE ");
    query.push_str(&mapping.name);
    query.push_str(" SET SYS_VERSION=SYS_VERSION+1");

    let mut params: Vec<Value> = Vec::with_capacity(request.values.len() + request.filter.len());
    for value in &request.values {
        mapping.require_key(&value.key)?;
        params.push(marshal_value(value)?);
        query.push_str(", ");
        query.push_str(&value.key);
        query.push_str("=?");
    }

    query.push_str(" WHERE SYS_ACTIVE=1");
    push_filter(&mut query, &mut params, mapping, &request.filter)?;

    tx.execute(&query, params_from_iter(params))?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PROTOCOL_ORM_SCHEMA, PROTOCOL_VERSION};

    fn widgets_schema() -> OrmSchema {
        let descriptor = format!(
            r#"{{
                "schema": "{}",
                "version": "{}",
                "mappings": [
                    {{
                        "name": "WIDGETS",
                        "primarykey": "NAME",
                        "fields": [
                            {{"key": "NAME", "type": "varchar", "value": "", "unique": true}},
                            {{"key": "COLOR", "type": "varchar", "value": "", "unique": false}},
                            {{"key": "PAYLOAD", "type": "blob", "value": "", "unique": false}}
                        ]
                    }}
                ]
            }}"#,
            PROTOCOL_ORM_SCHEMA, PROTOCOL_VERSION
        );
        OrmSchema::from_json(&descriptor).unwrap()
    }

    fn widgets_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE WIDGETS (
                 SYS_ACTIVE int NOT NULL DEFAULT 1,
                 SYS_VERSION int NOT NULL DEFAULT 0,
                 NAME varchar(64),
                 COLOR varchar(64),
                 PAYLOAD blob
             );
             CREATE TABLE WIDGETS_ARCHIVE (
                 SYS_ACTIVE int NOT NULL DEFAULT 1,
                 SYS_VERSION int NOT NULL DEFAULT 0,
                 NAME varchar(64),
                 COLOR varchar(64),
                 PAYLOAD blob
             );",
        )
        .unwrap();
        conn
    }

    fn varchar(key: &str, value: &str) -> OrmValue {
        OrmValue {
            key: key.to_string(),
            value_type: OrmType::Varchar,
            value: value.to_string(),
            unique: false,
        }
    }

    fn blob(key: &str, value: &str) -> OrmValue {
        OrmValue {
            key: key.to_string(),
            value_type: OrmType::Blob,
            value: value.to_string(),
            unique: false,
        }
    }

    fn save_widget(conn: &Connection, schema: &OrmSchema, name: &str, color: &str) {
        save(
            conn,
            schema,
            &OrmSaveRequest {
                entity: "WIDGETS".to_string(),
                values: vec![varchar("NAME", name), varchar("COLOR", color)],
            },
        )
        .unwrap();
    }

    #[test]
    fn test_marshal_round_trip_text_types() {
        for value_type in [
            OrmType::Integer,
            OrmType::Varchar,
            OrmType::Boolean,
            OrmType::Datetime,
            OrmType::Uuid,
        ] {
            let value = OrmValue {
                key: "K".to_string(),
                value_type,
                value: "42".to_string(),
                unique: false,
            };
            let marshalled = marshal_value(&value).unwrap();
            assert_eq!(marshalled, Value::Text("42".to_string()));

            let back = demarshal_value(value_type, ValueRef::Text(b"42")).unwrap();
            assert_eq!(back, "42");
        }
    }

    #[test]
    fn test_marshal_round_trip_blob() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x00\x01binary");
        let marshalled = marshal_value(&blob("K", &encoded)).unwrap();
        assert_eq!(marshalled, Value::Blob(b"\x00\x01binary".to_vec()));

        let back = demarshal_value(OrmType::Blob, ValueRef::Blob(b"\x00\x01binary")).unwrap();
        assert_eq!(back, encoded);
    }

    #[test]
    fn test_marshal_rejects_bad_base64() {
        assert!(marshal_value(&blob("K", "not base64!!!")).is_err());
    }

    #[test]
    fn test_save_and_read() {
        let conn = widgets_conn();
        let schema = widgets_schema();
        save_widget(&conn, &schema, "a", "red");
        save_widget(&conn, &schema, "b", "blue");

        let (columns, rows) = read(
            &conn,
            &schema,
            &OrmReadRequest {
                entity: "WIDGETS".to_string(),
                values: vec![varchar("NAME", ""), varchar("COLOR", "")],
                filter: vec![varchar("COLOR", "red")],
            },
        )
        .unwrap();

        assert_eq!(columns, ["NAME", "COLOR"]);
        assert_eq!(rows, [["a".to_string(), "red".to_string()]]);
    }

    #[test]
    fn test_read_rejects_unknown_key() {
        let conn = widgets_conn();
        let schema = widgets_schema();

        let err = read(
            &conn,
            &schema,
            &OrmReadRequest {
                entity: "WIDGETS".to_string(),
                values: vec![varchar("SIZE", "")],
                filter: vec![],
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid ORM key"));
    }

    #[test]
    fn test_injection_attempt_assembles_no_sql() {
        let conn = widgets_conn();
        let schema = widgets_schema();

        let err = save(
            &conn,
            &schema,
            &OrmSaveRequest {
                entity: "widgets; DROP TABLE x".to_string(),
                values: vec![varchar("NAME", "a")],
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid Mapping Name"));

        let err = delete(
            &conn,
            &schema,
            &OrmDeleteRequest {
                entity: "WIDGETS".to_string(),
                filter: vec![varchar("COLOR=? OR 1=1; --", "x")],
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid Key Name"));
    }

    #[test]
    fn test_soft_delete_hides_rows() {
        let conn = widgets_conn();
        let schema = widgets_schema();
        save_widget(&conn, &schema, "a", "red");

        delete(
            &conn,
            &schema,
            &OrmDeleteRequest {
                entity: "WIDGETS".to_string(),
                filter: vec![varchar("NAME", "a")],
            },
        )
        .unwrap();

        let (_, rows) = read(
            &conn,
            &schema,
            &OrmReadRequest {
                entity: "WIDGETS".to_string(),
                values: vec![varchar("NAME", "")],
                filter: vec![],
            },
        )
        .unwrap();
        assert!(rows.is_empty());

        // The row survives soft-deleted
        let raw: i64 = conn
            .query_row("SELECT COUNT(*) FROM WIDGETS WHERE SYS_ACTIVE=0", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(raw, 1);
    }

    #[test]
    fn test_versioned_update_archives_pre_image() {
        let mut conn = widgets_conn();
        let schema = widgets_schema();
        save_widget(&conn, &schema, "a", "red");

        update(
            &mut conn,
            &schema,
            &OrmUpdateRequest {
                entity: "WIDGETS".to_string(),
                values: vec![varchar("COLOR", "blue")],
                filter: vec![varchar("NAME", "a")],
            },
        )
        .unwrap();

        let (color, version): (String, i64) = conn
            .query_row(
                "SELECT COLOR, SYS_VERSION FROM WIDGETS WHERE NAME='a' AND SYS_ACTIVE=1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(color, "blue");
        assert_eq!(version, 1);

        let (archived_color, archived_version): (String, i64) = conn
            .query_row(
                "SELECT COLOR, SYS_VERSION FROM WIDGETS_ARCHIVE WHERE NAME='a'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(archived_color, "red");
        assert_eq!(archived_version, 0);
    }

    #[test]
    fn test_update_failure_rolls_back_archive() {
        let mut conn = widgets_conn();
        let schema = widgets_schema();
        save_widget(&conn, &schema, "a", "red");

        // The bad value key fails after the archive copy ran
        let err = update(
            &mut conn,
            &schema,
            &OrmUpdateRequest {
                entity: "WIDGETS".to_string(),
                values: vec![varchar("SIZE", "big")],
                filter: vec![varchar("NAME", "a")],
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid ORM key"));

        let archived: i64 = conn
            .query_row("SELECT COUNT(*) FROM WIDGETS_ARCHIVE", [], |r| r.get(0))
            .unwrap();
        assert_eq!(archived, 0);

        let version: i64 = conn
            .query_row("SELECT SYS_VERSION FROM WIDGETS WHERE NAME='a'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(version, 0);
    }

    #[test]
    fn test_blob_column_read_back() {
        let conn = widgets_conn();
        let schema = widgets_schema();

        let encoded = base64::engine::general_purpose::STANDARD.encode(b"payload bytes");
        save(
            &conn,
            &schema,
            &OrmSaveRequest {
                entity: "WIDGETS".to_string(),
                values: vec![varchar("NAME", "a"), blob("PAYLOAD", &encoded)],
            },
        )
        .unwrap();

        let (columns, rows) = read(
            &conn,
            &schema,
            &OrmReadRequest {
                entity: "WIDGETS".to_string(),
                values: vec![blob("PAYLOAD", "")],
                filter: vec![varchar("NAME", "a")],
            },
        )
        .unwrap();
        assert_eq!(columns, ["PAYLOAD"]);
        assert_eq!(rows, [[encoded]]);
    }
}
