//! Asset DAG endpoints
//!
//! Reads list the active children of a parent; writes validate parent
//! existence and run inside a transaction where more than one row is
//! touched. Binary upload stores the blob under the fresh entity uuid
//! after the inactive row is inserted; download streams it back without a
//! checksum re-check.

use crate::handlers::json_reply;
use crate::AppState;
use assethub_core::db::{blobs, repo};
use assethub_core::error::Result;
use assethub_core::protocol::{
    parse_request, EntitiesReply, FoldersReply, Header, HubsReply, ItemsReply, NewEntityReply,
    NewFolderReply, NewFolderRequest, NewItemReply, NewItemRequest, NewProjectReply,
    NewProjectRequest, ProjectsReply, UpdateEntityReply, UpdateEntityRequest, PROTOCOL_ENTITIES,
    PROTOCOL_HUBS, PROTOCOL_ITEMS, PROTOCOL_NEW_ENTITY, PROTOCOL_NEW_FOLDER, PROTOCOL_NEW_ITEM,
    PROTOCOL_NEW_PROJECT, PROTOCOL_PROJECTS, PROTOCOL_ROOT_FOLDERS, PROTOCOL_SUB_FOLDERS,
    PROTOCOL_UPDATE_ENTITY,
};
use assethub_core::session::{LogLevel, LogType, Session};
use assethub_core::util::{match_root, match_uuid_path, new_uuid};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use rusqlite::Connection;
use sha1::{Digest, Sha1};

/// Dispatch the `data/*` URL space. Returns `Ok(None)` when no endpoint
/// matches.
pub fn handle(
    state: &AppState,
    session: &Session,
    conn: &mut Connection,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Result<Option<Response>> {
    if method == Method::GET {
        if match_root(path, "data/hubs", true) {
            return list_hubs(state, session, conn).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/hubs", "") {
            return list_projects(state, session, conn, &uuid).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/projects", "rootfolders") {
            return list_root_folders(state, session, conn, &uuid).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/folders", "subfolders") {
            return list_sub_folders(state, session, conn, &uuid).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/folders", "items") {
            return list_items(state, session, conn, &uuid).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/items", "entities") {
            return list_entities(state, session, conn, &uuid).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/download", "") {
            return download(state, session, conn, &uuid).map(Some);
        }
    }

    if method == Method::POST {
        if let Some(uuid) = match_uuid_path(path, "data/hubs", "") {
            return new_project(state, session, conn, &uuid, body).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/folders", "newfolder") {
            return new_folder(state, session, conn, &uuid, body).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/folders", "newitem") {
            return new_item(state, session, conn, &uuid, body).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/upload", "") {
            return upload(state, session, conn, &uuid, body).map(Some);
        }
        if let Some(uuid) = match_uuid_path(path, "data/entities", "") {
            return update_entity(state, session, conn, &uuid, body).map(Some);
        }
    }

    Ok(None)
}

fn list_hubs(state: &AppState, session: &Session, conn: &Connection) -> Result<Response> {
    state.session_log.log(
        session,
        "Retrieving hubs",
        LogType::DataHubs,
        LogLevel::Console,
    );

    let hubs = repo::list_hubs(conn)?;
    Ok(json_reply(&HubsReply {
        header: Header::new(PROTOCOL_HUBS),
        hubs,
    }))
}

fn list_projects(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    hub_uuid: &str,
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Retrieving projects for hub: {}", hub_uuid),
        LogType::DataProjects,
        LogLevel::Console,
    );

    let projects = repo::list_projects(conn, hub_uuid)?;
    Ok(json_reply(&ProjectsReply {
        header: Header::new(PROTOCOL_PROJECTS),
        hub_uuid: hub_uuid.to_string(),
        projects,
    }))
}

fn list_root_folders(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    project_uuid: &str,
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Retrieving root folders for project: {}", project_uuid),
        LogType::DataRootFolders,
        LogLevel::Console,
    );

    let folders = repo::list_root_folders(conn, project_uuid)?;
    Ok(json_reply(&FoldersReply {
        header: Header::new(PROTOCOL_ROOT_FOLDERS),
        folders,
    }))
}

fn list_sub_folders(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    folder_uuid: &str,
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Retrieving subfolders for folder: {}", folder_uuid),
        LogType::DataSubFolders,
        LogLevel::Console,
    );

    let folders = repo::list_sub_folders(conn, folder_uuid)?;
    Ok(json_reply(&FoldersReply {
        header: Header::new(PROTOCOL_SUB_FOLDERS),
        folders,
    }))
}

fn list_items(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    folder_uuid: &str,
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Retrieving items for folder: {}", folder_uuid),
        LogType::DataItems,
        LogLevel::Console,
    );

    let items = repo::list_items(conn, folder_uuid)?;
    Ok(json_reply(&ItemsReply {
        header: Header::new(PROTOCOL_ITEMS),
        items,
    }))
}

fn list_entities(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    item_uuid: &str,
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Retrieving entities for item: {}", item_uuid),
        LogType::DataEntities,
        LogLevel::Console,
    );

    let entities = repo::list_entities(conn, item_uuid)?;
    Ok(json_reply(&EntitiesReply {
        header: Header::new(PROTOCOL_ENTITIES),
        entities,
    }))
}

fn new_project(
    state: &AppState,
    session: &Session,
    conn: &mut Connection,
    hub_uuid: &str,
    body: &[u8],
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Creating new project for hub: {}", hub_uuid),
        LogType::DataNewProject,
        LogLevel::Console,
    );

    let request: NewProjectRequest = parse_request(body, PROTOCOL_NEW_PROJECT)?;

    let project_uuid = new_uuid();
    let root_folder_uuid = new_uuid();

    // Project plus its root folder, atomically
    let tx = conn.transaction()?;
    repo::create_project(&tx, &project_uuid, &request.project_name, hub_uuid)?;
    repo::create_folder(&tx, &root_folder_uuid, &project_uuid, &request.project_name, "")?;
    tx.commit()?;

    Ok(json_reply(&NewProjectReply {
        header: Header::new(PROTOCOL_NEW_PROJECT),
        hub_uuid: hub_uuid.to_string(),
        project_uuid,
        root_folder_uuid,
    }))
}

fn new_folder(
    state: &AppState,
    session: &Session,
    conn: &mut Connection,
    parent_uuid: &str,
    body: &[u8],
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Creating new subfolder for folder: {}", parent_uuid),
        LogType::DataNewFolder,
        LogLevel::Console,
    );

    let request: NewFolderRequest = parse_request(body, PROTOCOL_NEW_FOLDER)?;

    // The new folder inherits the parent's project
    let folder = repo::folder_by_uuid(conn, parent_uuid)?;

    let sub_folder_uuid = new_uuid();

    let tx = conn.transaction()?;
    repo::create_folder(
        &tx,
        &sub_folder_uuid,
        &folder.project_uuid,
        &request.folder_name,
        &folder.uuid,
    )?;
    tx.commit()?;

    Ok(json_reply(&NewFolderReply {
        header: Header::new(PROTOCOL_NEW_FOLDER),
        project_uuid: folder.project_uuid,
        parent_uuid: folder.uuid,
        sub_folder_uuid,
    }))
}

fn new_item(
    state: &AppState,
    session: &Session,
    conn: &mut Connection,
    folder_uuid: &str,
    body: &[u8],
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Creating new item for folder: {}", folder_uuid),
        LogType::DataNewItem,
        LogLevel::Console,
    );

    let request: NewItemRequest = parse_request(body, PROTOCOL_NEW_ITEM)?;

    let folder = repo::folder_by_uuid(conn, folder_uuid)?;

    let item_uuid = new_uuid();

    let tx = conn.transaction()?;
    repo::create_item(&tx, &item_uuid, &folder.uuid, &request.item_name)?;
    tx.commit()?;

    Ok(json_reply(&NewItemReply {
        header: Header::new(PROTOCOL_NEW_ITEM),
        item_uuid,
        folder_uuid: folder_uuid.to_string(),
    }))
}

fn upload(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    item_uuid: &str,
    body: &[u8],
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Uploading data for item: {}", item_uuid),
        LogType::DataUpload,
        LogLevel::Console,
    );

    let item = repo::item_by_uuid(conn, item_uuid)?;

    let entity_uuid = new_uuid();
    let sha1_hex = hex::encode(Sha1::digest(body));

    // Row before file: a failed write leaves a dangling inactive row,
    // never an unreferenced blob.
    repo::create_entity(conn, &entity_uuid, &item.uuid, &sha1_hex, body.len() as i64, false)?;
    blobs::write_blob(&state.config.data.directory, &entity_uuid, body)?;

    Ok(json_reply(&NewEntityReply {
        header: Header::new(PROTOCOL_NEW_ENTITY),
        item_uuid: item_uuid.to_string(),
        entity_uuid,
    }))
}

fn update_entity(
    state: &AppState,
    session: &Session,
    conn: &mut Connection,
    entity_uuid: &str,
    body: &[u8],
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Updating entity: {}", entity_uuid),
        LogType::DataUpdateEntity,
        LogLevel::Console,
    );

    let request: UpdateEntityRequest = parse_request(body, PROTOCOL_UPDATE_ENTITY)?;

    let tx = conn.transaction()?;
    let entity = repo::entity_by_uuid(&tx, entity_uuid, false)?;
    repo::update_entity(
        &tx,
        &entity.uuid,
        &request.data_type,
        &request.meta_data.to_string(),
        true,
    )?;
    tx.commit()?;

    Ok(json_reply(&UpdateEntityReply {
        header: Header::new(PROTOCOL_UPDATE_ENTITY),
        item_uuid: entity.item_uuid,
        entity_uuid: entity.uuid,
    }))
}

fn download(
    state: &AppState,
    session: &Session,
    conn: &Connection,
    entity_uuid: &str,
) -> Result<Response> {
    state.session_log.log(
        session,
        &format!("Downloading entity: {}", entity_uuid),
        LogType::DataDownload,
        LogLevel::Console,
    );

    let entity = repo::entity_by_uuid(conn, entity_uuid, false)?;
    let bytes = blobs::read_blob(&state.config.data.directory, &entity.uuid)?;

    Ok(bytes.into_response())
}
