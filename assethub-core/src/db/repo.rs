//! Asset DAG repository
//!
//! Query and insert operations for hubs, projects, folders, items and
//! entities. All reads filter on `active=1`; entity listings are ordered
//! by timestamp. Every function takes a plain connection so that
//! multi-statement writes compose under a caller-owned transaction.

use crate::error::{Error, Result};
use crate::types::{Entity, Folder, Hub, Item, Project};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

fn row_to_hub(row: &Row) -> rusqlite::Result<Hub> {
    Ok(Hub {
        uuid: row.get(0)?,
        name: row.get(1)?,
        active: row.get(2)?,
    })
}

fn row_to_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        uuid: row.get(0)?,
        hub_uuid: row.get(1)?,
        name: row.get(2)?,
        active: row.get(3)?,
    })
}

fn row_to_folder(row: &Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        uuid: row.get(0)?,
        project_uuid: row.get(1)?,
        parent_uuid: row.get(2)?,
        name: row.get(3)?,
        active: row.get(4)?,
    })
}

fn row_to_item(row: &Row) -> rusqlite::Result<Item> {
    Ok(Item {
        uuid: row.get(0)?,
        folder_uuid: row.get(1)?,
        project_uuid: row.get(2)?,
        name: row.get(3)?,
        active: row.get(4)?,
    })
}

fn row_to_entity(row: &Row) -> rusqlite::Result<Entity> {
    Ok(Entity {
        uuid: row.get(0)?,
        item_uuid: row.get(1)?,
        data_type: row.get(2)?,
        sha1: row.get(3)?,
        file_size: row.get::<_, i64>(4)?.to_string(),
        meta_data: row.get(5)?,
        timestamp: row.get(6)?,
        active: row.get(7)?,
    })
}

// ============================================
// Reads
// ============================================

/// List all active hubs.
pub fn list_hubs(conn: &Connection) -> Result<Vec<Hub>> {
    let mut stmt =
        conn.prepare("SELECT uuid, hubname, active FROM netstorage_hubs WHERE active=1")?;
    let hubs = stmt
        .query_map([], row_to_hub)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(hubs)
}

/// List all active projects of a hub.
pub fn list_projects(conn: &Connection, hub_uuid: &str) -> Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, hubuuid, projectname, active FROM netstorage_projects
         WHERE hubuuid=?1 AND active=1",
    )?;
    let projects = stmt
        .query_map([hub_uuid], row_to_project)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(projects)
}

/// List the active root folders of a project.
pub fn list_root_folders(conn: &Connection, project_uuid: &str) -> Result<Vec<Folder>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, projectuuid, parentuuid, foldername, active FROM netstorage_folders
         WHERE projectuuid=?1 AND parentuuid='' AND active=1",
    )?;
    let folders = stmt
        .query_map([project_uuid], row_to_folder)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(folders)
}

/// List the active sub-folders of a folder.
pub fn list_sub_folders(conn: &Connection, folder_uuid: &str) -> Result<Vec<Folder>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, projectuuid, parentuuid, foldername, active FROM netstorage_folders
         WHERE parentuuid=?1 AND active=1",
    )?;
    let folders = stmt
        .query_map([folder_uuid], row_to_folder)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(folders)
}

/// Load an active folder by uuid.
pub fn folder_by_uuid(conn: &Connection, folder_uuid: &str) -> Result<Folder> {
    conn.query_row(
        "SELECT uuid, projectuuid, parentuuid, foldername, active FROM netstorage_folders
         WHERE uuid=?1 AND active=1",
        [folder_uuid],
        row_to_folder,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("folder", folder_uuid))
}

/// List the active items of a folder (project uuid derived by join).
pub fn list_items(conn: &Connection, folder_uuid: &str) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT netstorage_items.uuid, netstorage_items.folderuuid,
                netstorage_folders.projectuuid, netstorage_items.itemname,
                netstorage_items.active
         FROM netstorage_items
         LEFT JOIN netstorage_folders ON netstorage_folders.uuid=netstorage_items.folderuuid
         WHERE folderuuid=?1 AND netstorage_items.active=1",
    )?;
    let items = stmt
        .query_map([folder_uuid], row_to_item)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

/// Load an active item by uuid.
pub fn item_by_uuid(conn: &Connection, item_uuid: &str) -> Result<Item> {
    conn.query_row(
        "SELECT netstorage_items.uuid, netstorage_items.folderuuid,
                netstorage_folders.projectuuid, netstorage_items.itemname,
                netstorage_items.active
         FROM netstorage_items
         LEFT JOIN netstorage_folders ON netstorage_folders.uuid=netstorage_items.folderuuid
         WHERE netstorage_items.uuid=?1 AND netstorage_items.active=1",
        [item_uuid],
        row_to_item,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("item", item_uuid))
}

/// List the active entities of an item, oldest first.
pub fn list_entities(conn: &Connection, item_uuid: &str) -> Result<Vec<Entity>> {
    let mut stmt = conn.prepare(
        "SELECT uuid, itemuuid, datatype, sha1, filesize, metadata, timestamp, active
         FROM netstorage_entities
         WHERE itemuuid=?1 AND active=1
         ORDER BY timestamp",
    )?;
    let entities = stmt
        .query_map([item_uuid], row_to_entity)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entities)
}

/// Load an entity by uuid, optionally requiring it to be active.
pub fn entity_by_uuid(conn: &Connection, entity_uuid: &str, must_be_active: bool) -> Result<Entity> {
    let active_condition = if must_be_active { " AND active=1" } else { "" };
    let query = format!(
        "SELECT uuid, itemuuid, datatype, sha1, filesize, metadata, timestamp, active
         FROM netstorage_entities WHERE uuid=?1{}",
        active_condition
    );

    conn.query_row(&query, [entity_uuid], row_to_entity)
        .optional()?
        .ok_or_else(|| Error::not_found("entity", entity_uuid))
}

// ============================================
// Writes
// ============================================

/// Insert a project under an active hub.
pub fn create_project(
    conn: &Connection,
    project_uuid: &str,
    project_name: &str,
    hub_uuid: &str,
) -> Result<()> {
    let hub_exists: Option<String> = conn
        .query_row(
            "SELECT uuid FROM netstorage_hubs WHERE uuid=?1 AND active=1",
            [hub_uuid],
            |row| row.get(0),
        )
        .optional()?;
    if hub_exists.is_none() {
        return Err(Error::not_found("hub", hub_uuid));
    }

    conn.execute(
        "INSERT INTO netstorage_projects (uuid, projectname, hubuuid, active) VALUES (?1, ?2, ?3, 1)",
        params![project_uuid, project_name, hub_uuid],
    )?;
    Ok(())
}

/// Insert a folder under an active project, and under an active parent
/// folder unless `parent_uuid` is empty (root folder).
pub fn create_folder(
    conn: &Connection,
    folder_uuid: &str,
    project_uuid: &str,
    folder_name: &str,
    parent_uuid: &str,
) -> Result<()> {
    let project_exists: Option<String> = conn
        .query_row(
            "SELECT uuid FROM netstorage_projects WHERE uuid=?1 AND active=1",
            [project_uuid],
            |row| row.get(0),
        )
        .optional()?;
    if project_exists.is_none() {
        return Err(Error::not_found("project", project_uuid));
    }

    if !parent_uuid.is_empty() {
        let parent_exists: Option<String> = conn
            .query_row(
                "SELECT uuid FROM netstorage_folders WHERE uuid=?1 AND active=1",
                [parent_uuid],
                |row| row.get(0),
            )
            .optional()?;
        if parent_exists.is_none() {
            return Err(Error::not_found("parent folder", parent_uuid));
        }
    }

    conn.execute(
        "INSERT INTO netstorage_folders (uuid, foldername, projectuuid, parentuuid, active)
         VALUES (?1, ?2, ?3, ?4, 1)",
        params![folder_uuid, folder_name, project_uuid, parent_uuid],
    )?;
    Ok(())
}

/// Insert an item into a folder.
pub fn create_item(
    conn: &Connection,
    item_uuid: &str,
    folder_uuid: &str,
    item_name: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO netstorage_items (uuid, itemname, folderuuid, active) VALUES (?1, ?2, ?3, 1)",
        params![item_uuid, item_name, folder_uuid],
    )?;
    Ok(())
}

/// Insert an entity row. Freshly uploaded entities are inactive until a
/// metadata update promotes them.
pub fn create_entity(
    conn: &Connection,
    entity_uuid: &str,
    item_uuid: &str,
    sha1: &str,
    file_size: i64,
    active: bool,
) -> Result<()> {
    let timestamp = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO netstorage_entities (uuid, itemuuid, datatype, sha1, filesize, metadata, timestamp, active)
         VALUES (?1, ?2, '', ?3, ?4, '', ?5, ?6)",
        params![entity_uuid, item_uuid, sha1, file_size, timestamp, active as i64],
    )?;
    Ok(())
}

/// Set an entity's data type and metadata, and its active flag.
pub fn update_entity(
    conn: &Connection,
    entity_uuid: &str,
    data_type: &str,
    meta_data: &str,
    active: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE netstorage_entities SET active=?1, datatype=?2, metadata=?3 WHERE uuid=?4",
        params![active as i64, data_type, meta_data, entity_uuid],
    )?;
    Ok(())
}
