//! Wire protocol envelopes
//!
//! Every JSON body carries a `protocol` (reverse-DNS identifier) and a
//! `version`. Both are verified before the payload is looked at; a
//! mismatch rejects the request without side effects. The identifiers and
//! field spellings below are a compatibility contract with the existing
//! desktop client and must not change.

use crate::error::{Error, Result};
use crate::orm::OrmValue;
use crate::types::{Entity, Folder, Hub, Item, Project};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Protocol version carried by every envelope
pub const PROTOCOL_VERSION: &str = "2.0.0";
/// Error reply identifier
pub const PROTOCOL_ERROR: &str = "com.autodesk.error";

pub const PROTOCOL_SESSION_NEW: &str = "com.autodesk.netfabbsession.new";
pub const PROTOCOL_SESSION_AUTH: &str = "com.autodesk.netfabbsession.auth";

pub const PROTOCOL_HUBS: &str = "com.autodesk.netfabbstorage.hubs";
pub const PROTOCOL_PROJECTS: &str = "com.autodesk.netfabbstorage.projects";
pub const PROTOCOL_ROOT_FOLDERS: &str = "com.autodesk.netfabbstorage.rootfolders";
pub const PROTOCOL_SUB_FOLDERS: &str = "com.autodesk.netfabbstorage.subfolders";
pub const PROTOCOL_ITEMS: &str = "com.autodesk.netfabbstorage.items";
pub const PROTOCOL_ENTITIES: &str = "com.autodesk.netfabbstorage.entities";
pub const PROTOCOL_NEW_PROJECT: &str = "com.autodesk.netfabbstorage.newproject";
pub const PROTOCOL_NEW_FOLDER: &str = "com.autodesk.netfabbstorage.newfolder";
pub const PROTOCOL_NEW_ITEM: &str = "com.autodesk.netfabbstorage.newitem";
pub const PROTOCOL_NEW_ENTITY: &str = "com.autodesk.netfabbstorage.newentity";
pub const PROTOCOL_UPDATE_ENTITY: &str = "com.autodesk.netfabbstorage.updateentity";

pub const PROTOCOL_ORM_READ: &str = "com.autodesk.netfabborm.read";
pub const PROTOCOL_ORM_SAVE: &str = "com.autodesk.netfabborm.save";
pub const PROTOCOL_ORM_DELETE: &str = "com.autodesk.netfabborm.delete";
pub const PROTOCOL_ORM_UPDATE: &str = "com.autodesk.netfabborm.update";
pub const PROTOCOL_ORM_SCHEMA: &str = "com.autodesk.netfabborm.schema";

pub const PROTOCOL_TASK_NEW: &str = "com.autodesk.netfabbtasks.new";
pub const PROTOCOL_TASK_CLEAR: &str = "com.autodesk.netfabbtasks.clear";
pub const PROTOCOL_TASK_HANDLE: &str = "com.autodesk.netfabbtasks.handle";
pub const PROTOCOL_TASK_UPDATE: &str = "com.autodesk.netfabbtasks.update";
pub const PROTOCOL_TASK_STATUS: &str = "com.autodesk.netfabbtasks.status";

/// The `protocol` + `version` pair present in every envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub protocol: String,
    pub version: String,
}

impl Header {
    /// Build a header for an outgoing reply.
    pub fn new(protocol: &str) -> Self {
        Self {
            protocol: protocol.to_string(),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Verify an incoming header against the endpoint's protocol id.
    pub fn expect(&self, protocol: &str) -> Result<()> {
        if self.protocol != protocol {
            return Err(Error::Protocol(format!(
                "Invalid protocol for end point: {}",
                self.protocol
            )));
        }
        if self.version != PROTOCOL_VERSION {
            return Err(Error::Protocol(format!(
                "Invalid protocol version for end point: {}",
                self.version
            )));
        }
        Ok(())
    }
}

/// Parse a request body, verifying the envelope before the payload.
pub fn parse_request<T: DeserializeOwned>(body: &[u8], protocol: &str) -> Result<T> {
    let header: Header = serde_json::from_slice(body)?;
    header.expect(protocol)?;
    Ok(serde_json::from_slice(body)?)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(rename = "userid")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateSessionRequest {
    #[serde(rename = "sessionuuid")]
    pub session_uuid: String,
    #[serde(rename = "authtype")]
    pub auth_type: String,
    #[serde(rename = "authkey")]
    pub auth_key: String,
}

#[derive(Debug, Deserialize)]
pub struct NewProjectRequest {
    #[serde(rename = "projectname")]
    pub project_name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewFolderRequest {
    #[serde(rename = "foldername")]
    pub folder_name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewItemRequest {
    #[serde(rename = "itemname")]
    pub item_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    #[serde(rename = "datatype")]
    pub data_type: String,
    /// Opaque metadata; stored as serialized JSON text
    #[serde(rename = "metadata", default)]
    pub meta_data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct OrmReadRequest {
    pub entity: String,
    #[serde(default)]
    pub values: Vec<OrmValue>,
    #[serde(default)]
    pub filter: Vec<OrmValue>,
}

#[derive(Debug, Deserialize)]
pub struct OrmSaveRequest {
    pub entity: String,
    #[serde(default)]
    pub values: Vec<OrmValue>,
}

#[derive(Debug, Deserialize)]
pub struct OrmDeleteRequest {
    pub entity: String,
    #[serde(default)]
    pub filter: Vec<OrmValue>,
}

#[derive(Debug, Deserialize)]
pub struct OrmUpdateRequest {
    pub entity: String,
    #[serde(default)]
    pub values: Vec<OrmValue>,
    #[serde(default)]
    pub filter: Vec<OrmValue>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskNewRequest {
    pub name: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskClearRequest {}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskHandleRequest {
    pub name: String,
    #[serde(default)]
    pub worker: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskUpdateRequest {
    pub status: String,
    #[serde(rename = "workersecret")]
    pub worker_secret: String,
    #[serde(default)]
    pub results: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "errormessage")]
    pub error_message: String,
    #[serde(rename = "loguuid")]
    pub log_uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "sessionuuid")]
    pub session_uuid: String,
    #[serde(rename = "authtype")]
    pub auth_type: String,
    #[serde(rename = "userid")]
    pub user_id: String,
    /// Hex SHA-1 of the configured salt; empty when no salt is configured
    pub salt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticateSessionReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "sessionuuid")]
    pub session_uuid: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HubsReply {
    #[serde(flatten)]
    pub header: Header,
    pub hubs: Vec<Hub>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectsReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "hubuuid")]
    pub hub_uuid: String,
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FoldersReply {
    #[serde(flatten)]
    pub header: Header,
    pub folders: Vec<Folder>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemsReply {
    #[serde(flatten)]
    pub header: Header,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntitiesReply {
    #[serde(flatten)]
    pub header: Header,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewProjectReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "hubuuid")]
    pub hub_uuid: String,
    #[serde(rename = "projectuuid")]
    pub project_uuid: String,
    #[serde(rename = "rootfolderuuid")]
    pub root_folder_uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewFolderReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "projectuuid")]
    pub project_uuid: String,
    #[serde(rename = "parentuuid")]
    pub parent_uuid: String,
    #[serde(rename = "subfolderuuid")]
    pub sub_folder_uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewItemReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "itemuuid")]
    pub item_uuid: String,
    #[serde(rename = "folderuuid")]
    pub folder_uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewEntityReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "itemuuid")]
    pub item_uuid: String,
    #[serde(rename = "entityuuid")]
    pub entity_uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEntityReply {
    #[serde(flatten)]
    pub header: Header,
    #[serde(rename = "itemuuid")]
    pub item_uuid: String,
    #[serde(rename = "entityuuid")]
    pub entity_uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrmReadReply {
    #[serde(flatten)]
    pub header: Header,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrmSaveReply {
    #[serde(flatten)]
    pub header: Header,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrmDeleteReply {
    #[serde(flatten)]
    pub header: Header,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrmUpdateReply {
    #[serde(flatten)]
    pub header: Header,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskNewReply {
    #[serde(flatten)]
    pub header: Header,
    pub uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskClearReply {
    #[serde(flatten)]
    pub header: Header,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskHandleReply {
    #[serde(flatten)]
    pub header: Header,
    /// Claimed task uuid; empty when the queue had no eligible task
    pub uuid: String,
    #[serde(rename = "workersecret")]
    pub worker_secret: String,
    pub name: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskUpdateReply {
    #[serde(flatten)]
    pub header: Header,
    pub uuid: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStatusReply {
    #[serde(flatten)]
    pub header: Header,
    pub uuid: String,
    pub status: String,
    pub name: String,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    #[serde(default)]
    pub result: HashMap<String, String>,
    pub worker: String,
    pub timestamp: String,
}
