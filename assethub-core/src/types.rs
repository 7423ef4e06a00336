//! Core domain types for assethub
//!
//! These types represent the hierarchical asset store
//! (hub → project → folder → sub-folder* → item → entity) and the task
//! queue records. The serde field names are the wire names the desktop
//! client expects; `active` travels as a 0/1 integer and `filesize` as a
//! string.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================
// Asset DAG records
// ============================================

/// Top of the asset DAG. Hubs are provisioned out of band and never
/// created through the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hub {
    /// Unique identifier
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Soft-delete marker (1 = live)
    pub active: i64,
}

/// A project under a hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub uuid: String,
    /// Owning hub
    #[serde(rename = "hubuuid")]
    pub hub_uuid: String,
    /// Display name
    pub name: String,
    /// Soft-delete marker
    pub active: i64,
}

/// A folder within a project. Root folders carry an empty parent uuid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    /// Unique identifier
    pub uuid: String,
    /// Owning project
    #[serde(rename = "projectuuid")]
    pub project_uuid: String,
    /// Parent folder, or "" for a root folder
    #[serde(rename = "parentuuid")]
    pub parent_uuid: String,
    /// Display name
    pub name: String,
    /// Soft-delete marker
    pub active: i64,
}

/// An item within a folder. The project uuid is derived by join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier
    pub uuid: String,
    /// Owning project (derived)
    #[serde(rename = "projectuuid")]
    pub project_uuid: String,
    /// Owning folder
    #[serde(rename = "folderuuid")]
    pub folder_uuid: String,
    /// Display name
    pub name: String,
    /// Soft-delete marker
    pub active: i64,
}

/// An immutable binary payload plus mutable metadata under an item.
///
/// Entities are born inactive on upload and promoted to active by a
/// follow-up metadata update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (also names the blob file)
    pub uuid: String,
    /// Owning item
    #[serde(rename = "itemuuid")]
    pub item_uuid: String,
    /// Declared content type
    #[serde(rename = "datatype")]
    pub data_type: String,
    /// Lowercase hex SHA-1 of the blob
    pub sha1: String,
    /// Blob size in bytes, rendered as a string on the wire
    #[serde(rename = "filesize")]
    pub file_size: String,
    /// Opaque JSON metadata text
    #[serde(rename = "metadata")]
    pub meta_data: String,
    /// Creation timestamp (RFC3339)
    pub timestamp: String,
    /// Soft-delete marker
    pub active: i64,
}

// ============================================
// Tasks
// ============================================

/// Lifecycle states of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    /// Waiting in the queue
    New,
    /// Claimed by a worker
    Inprocess,
    /// Completed successfully
    Success,
    /// Completed with an error
    Error,
    /// Cancelled before or during processing
    Canceled,
    /// Handed back for another claim
    Returned,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::New => "NEW",
            TaskState::Inprocess => "INPROCESS",
            TaskState::Success => "SUCCESS",
            TaskState::Error => "ERROR",
            TaskState::Canceled => "CANCELED",
            TaskState::Returned => "RETURNED",
        }
    }

    /// True for the states a worker may report on completion.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Success | TaskState::Error | TaskState::Canceled | TaskState::Returned
        )
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(TaskState::New),
            "INPROCESS" => Ok(TaskState::Inprocess),
            "SUCCESS" => Ok(TaskState::Success),
            "ERROR" => Ok(TaskState::Error),
            "CANCELED" => Ok(TaskState::Canceled),
            "RETURNED" => Ok(TaskState::Returned),
            _ => Err(format!("Invalid status string: {}", s)),
        }
    }
}

/// A task row as reported by the status endpoint.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    /// Task identifier
    pub uuid: String,
    /// Task name workers poll for
    pub name: String,
    /// Current lifecycle state (stored string form)
    pub status: String,
    /// Caller-supplied parameters
    pub parameters: HashMap<String, String>,
    /// Worker-reported results
    pub result: HashMap<String, String>,
    /// Worker that claimed the task, if any
    pub worker: String,
    /// Enqueue timestamp (RFC3339)
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_task_state_round_trip() {
        for state in [
            TaskState::New,
            TaskState::Inprocess,
            TaskState::Success,
            TaskState::Error,
            TaskState::Canceled,
            TaskState::Returned,
        ] {
            assert_eq!(TaskState::from_str(state.as_str()).unwrap(), state);
        }
    }

    #[test]
    fn test_task_state_rejects_unknown() {
        assert!(TaskState::from_str("DONE").is_err());
        assert!(TaskState::from_str("success").is_err());
        assert!(TaskState::from_str("").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::New.is_terminal());
        assert!(!TaskState::Inprocess.is_terminal());
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Error.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(TaskState::Returned.is_terminal());
    }

    #[test]
    fn test_entity_wire_names() {
        let entity = Entity {
            uuid: "u".into(),
            item_uuid: "i".into(),
            data_type: "text/plain".into(),
            sha1: "abc".into(),
            file_size: "5".into(),
            meta_data: "{}".into(),
            timestamp: "2026-01-01T00:00:00+00:00".into(),
            active: 1,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["itemuuid"], "i");
        assert_eq!(json["datatype"], "text/plain");
        assert_eq!(json["filesize"], "5");
        assert_eq!(json["metadata"], "{}");
        assert_eq!(json["active"], 1);
    }
}
