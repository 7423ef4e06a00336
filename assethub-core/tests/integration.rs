//! Integration tests for the asset DAG store and blob lifecycle
//!
//! These exercise the create/list/upload/promote/download flow against a
//! provisioned database and a temporary blob directory, the way the HTTP
//! handlers drive it.

use assethub_core::db::{blobs, repo, schema};
use assethub_core::util::new_uuid;
use rusqlite::Connection;
use sha1::{Digest, Sha1};
use tempfile::TempDir;

fn provisioned_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    schema::provision(&conn).unwrap();
    conn
}

fn seed_hub(conn: &Connection) -> String {
    let hub_uuid = new_uuid();
    conn.execute(
        "INSERT INTO netstorage_hubs (uuid, hubname, active) VALUES (?1, 'Main Hub', 1)",
        [&hub_uuid],
    )
    .unwrap();
    hub_uuid
}

/// Create a project plus its root folder the way the handler does:
/// atomically, root folder named after the project.
fn create_project_with_root(conn: &mut Connection, hub_uuid: &str, name: &str) -> (String, String) {
    let project_uuid = new_uuid();
    let root_folder_uuid = new_uuid();

    let tx = conn.transaction().unwrap();
    repo::create_project(&tx, &project_uuid, name, hub_uuid).unwrap();
    repo::create_folder(&tx, &root_folder_uuid, &project_uuid, name, "").unwrap();
    tx.commit().unwrap();

    (project_uuid, root_folder_uuid)
}

// ============================================
// DAG creation and listing
// ============================================

#[test]
fn test_hub_listing_filters_inactive() {
    let conn = provisioned_conn();
    let active = seed_hub(&conn);
    conn.execute(
        "INSERT INTO netstorage_hubs (uuid, hubname, active) VALUES (?1, 'Retired', 0)",
        [new_uuid()],
    )
    .unwrap();

    let hubs = repo::list_hubs(&conn).unwrap();
    assert_eq!(hubs.len(), 1);
    assert_eq!(hubs[0].uuid, active);
    assert_eq!(hubs[0].name, "Main Hub");
}

#[test]
fn test_project_creation_requires_active_hub() {
    let conn = provisioned_conn();

    let err = repo::create_project(&conn, &new_uuid(), "P", &new_uuid()).unwrap_err();
    assert!(err.to_string().contains("hub not found"));
}

#[test]
fn test_project_with_root_folder() {
    let mut conn = provisioned_conn();
    let hub = seed_hub(&conn);

    let (project, root) = create_project_with_root(&mut conn, &hub, "P");

    let projects = repo::list_projects(&conn, &hub).unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].uuid, project);
    assert_eq!(projects[0].hub_uuid, hub);

    let roots = repo::list_root_folders(&conn, &project).unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].uuid, root);
    assert_eq!(roots[0].name, "P");
    assert_eq!(roots[0].parent_uuid, "");
}

#[test]
fn test_failed_root_folder_rolls_back_project() {
    let mut conn = provisioned_conn();
    let hub = seed_hub(&conn);

    let project_uuid = new_uuid();
    let tx = conn.transaction().unwrap();
    repo::create_project(&tx, &project_uuid, "P", &hub).unwrap();
    // Point the root folder at a project that does not exist, then drop
    // the transaction uncommitted.
    let err = repo::create_folder(&tx, &new_uuid(), &new_uuid(), "P", "");
    assert!(err.is_err());
    drop(tx);

    assert!(repo::list_projects(&conn, &hub).unwrap().is_empty());
}

#[test]
fn test_subfolder_inherits_project() {
    let mut conn = provisioned_conn();
    let hub = seed_hub(&conn);
    let (project, root) = create_project_with_root(&mut conn, &hub, "P");

    let parent = repo::folder_by_uuid(&conn, &root).unwrap();
    let sub_uuid = new_uuid();
    repo::create_folder(&conn, &sub_uuid, &parent.project_uuid, "docs", &parent.uuid).unwrap();

    let subs = repo::list_sub_folders(&conn, &root).unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].uuid, sub_uuid);
    assert_eq!(subs[0].project_uuid, project);
    assert_eq!(subs[0].parent_uuid, root);

    // Sub-folders do not show up as root folders
    assert_eq!(repo::list_root_folders(&conn, &project).unwrap().len(), 1);
}

#[test]
fn test_subfolder_requires_existing_parent() {
    let mut conn = provisioned_conn();
    let hub = seed_hub(&conn);
    let (project, _) = create_project_with_root(&mut conn, &hub, "P");

    let err = repo::create_folder(&conn, &new_uuid(), &project, "docs", &new_uuid()).unwrap_err();
    assert!(err.to_string().contains("parent folder not found"));
}

#[test]
fn test_folder_lookup_not_found() {
    let conn = provisioned_conn();
    let missing = new_uuid();
    let err = repo::folder_by_uuid(&conn, &missing).unwrap_err();
    assert_eq!(err.to_string(), format!("folder not found: {}", missing));
}

#[test]
fn test_items_carry_derived_project_uuid() {
    let mut conn = provisioned_conn();
    let hub = seed_hub(&conn);
    let (project, root) = create_project_with_root(&mut conn, &hub, "P");

    let item_uuid = new_uuid();
    repo::create_item(&conn, &item_uuid, &root, "part.stl").unwrap();

    let items = repo::list_items(&conn, &root).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].uuid, item_uuid);
    assert_eq!(items[0].project_uuid, project);

    let item = repo::item_by_uuid(&conn, &item_uuid).unwrap();
    assert_eq!(item.folder_uuid, root);
    assert_eq!(item.name, "part.stl");
}

// ============================================
// Entity and blob lifecycle
// ============================================

#[test]
fn test_entity_upload_promote_download() {
    let mut conn = provisioned_conn();
    let data_dir = TempDir::new().unwrap();
    let hub = seed_hub(&conn);
    let (_, root) = create_project_with_root(&mut conn, &hub, "P");

    let item_uuid = new_uuid();
    repo::create_item(&conn, &item_uuid, &root, "part.stl").unwrap();

    // Upload: inactive row first, then the blob
    let payload = b"hello";
    let entity_uuid = new_uuid();
    let sha1_hex = hex::encode(Sha1::digest(payload));
    repo::create_entity(&conn, &entity_uuid, &item_uuid, &sha1_hex, payload.len() as i64, false)
        .unwrap();
    blobs::write_blob(data_dir.path(), &entity_uuid, payload).unwrap();

    // The blob exists alongside the row
    assert!(blobs::blob_path(data_dir.path(), &entity_uuid).exists());
    assert_eq!(sha1_hex, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");

    // Inactive entities are invisible to listings
    assert!(repo::list_entities(&conn, &item_uuid).unwrap().is_empty());

    // But loadable without the active requirement, not with it
    assert!(repo::entity_by_uuid(&conn, &entity_uuid, false).is_ok());
    assert!(repo::entity_by_uuid(&conn, &entity_uuid, true).is_err());

    // Promote
    repo::update_entity(&conn, &entity_uuid, "text/plain", "{}", true).unwrap();

    let entities = repo::list_entities(&conn, &item_uuid).unwrap();
    assert_eq!(entities.len(), 1);
    let entity = &entities[0];
    assert_eq!(entity.uuid, entity_uuid);
    assert_eq!(entity.data_type, "text/plain");
    assert_eq!(entity.meta_data, "{}");
    assert_eq!(entity.sha1, sha1_hex);
    assert_eq!(entity.file_size, "5");
    assert_eq!(entity.active, 1);

    // Download returns the original bytes
    assert_eq!(blobs::read_blob(data_dir.path(), &entity_uuid).unwrap(), payload);
}

#[test]
fn test_entities_ordered_by_timestamp() {
    let mut conn = provisioned_conn();
    let hub = seed_hub(&conn);
    let (_, root) = create_project_with_root(&mut conn, &hub, "P");

    let item_uuid = new_uuid();
    repo::create_item(&conn, &item_uuid, &root, "part.stl").unwrap();

    let older = new_uuid();
    let newer = new_uuid();
    repo::create_entity(&conn, &newer, &item_uuid, "aa", 1, true).unwrap();
    repo::create_entity(&conn, &older, &item_uuid, "bb", 1, true).unwrap();

    conn.execute(
        "UPDATE netstorage_entities SET timestamp='2026-01-01T00:00:00+00:00' WHERE uuid=?1",
        [&older],
    )
    .unwrap();
    conn.execute(
        "UPDATE netstorage_entities SET timestamp='2026-01-02T00:00:00+00:00' WHERE uuid=?1",
        [&newer],
    )
    .unwrap();

    let entities = repo::list_entities(&conn, &item_uuid).unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].uuid, older);
    assert_eq!(entities[1].uuid, newer);
}

#[test]
fn test_upload_to_unknown_item_fails_before_any_write() {
    let conn = provisioned_conn();
    let missing = new_uuid();
    let err = repo::item_by_uuid(&conn, &missing).unwrap_err();
    assert_eq!(err.to_string(), format!("item not found: {}", missing));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM netstorage_entities", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}
