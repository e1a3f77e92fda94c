use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of repository node shown in a list.
///
/// Folders, sites and libraries are containers: trashing one hides every
/// descendant, which no single-item patch can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
    Site,
    Library,
}

impl NodeKind {
    pub fn is_container(&self) -> bool {
        !matches!(self, NodeKind::File)
    }
}

/// Offline synchronization state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Undefined,
    Pending,
    InProgress,
    Synced,
    Error,
}

/// A file, folder, site or library as returned by the content repository.
///
/// Only the fields that reconciliation touches are mutable in practice;
/// everything else is display data carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub marked_offline: bool,
    #[serde(default)]
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            parent_id: None,
            favorite: false,
            trashed: false,
            marked_offline: false,
            sync_status: SyncStatus::Undefined,
            mime_type: None,
            modified_at: None,
        }
    }

    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, NodeKind::File)
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, NodeKind::Folder)
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.favorite = favorite;
        self
    }

    pub fn with_marked_offline(mut self, marked: bool) -> Self {
        self.marked_offline = marked;
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}
