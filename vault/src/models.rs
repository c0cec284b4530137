//! Vault data model
//!
//! Folders and files share one flat collection and one id namespace.
//! The tree shape is carried entirely by `parent_id`.

use crate::media::MediaType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Node Id
// =============================================================================

/// Opaque node identifier, stable for the node's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    /// Fresh id of the form `<prefix>-<uuid>`.
    pub fn generate(prefix: &str) -> Self {
        NodeId(format!("{}-{}", prefix, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

// =============================================================================
// Node
// =============================================================================

/// Folder or file discriminator. File attributes only exist on `File`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    #[serde(rename_all = "camelCase")]
    File {
        media_type: MediaType,
        /// Human-readable size, e.g. "1.24 MB"
        size_label: String,
        /// Locator for the bytes (file:// URL, blob handle...). Opaque to the vault.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_ref: Option<String>,
    },
}

/// A single entry of the vault's flat collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Containing folder; `None` is the root
    pub parent_id: Option<NodeId>,
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Free-text recency label ("Today", "Just now")
    pub created_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

pub(crate) const JUST_NOW: &str = "Just now";

impl Node {
    pub fn folder(
        id: NodeId,
        parent_id: Option<NodeId>,
        name: impl Into<String>,
        created_label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            kind: NodeKind::Folder,
            created_label: created_label.into(),
            created_at: None,
        }
    }

    pub fn file(
        id: NodeId,
        parent_id: Option<NodeId>,
        name: impl Into<String>,
        media_type: MediaType,
        size_label: impl Into<String>,
        content_ref: Option<String>,
        created_label: impl Into<String>,
    ) -> Self {
        Self {
            id,
            parent_id,
            name: name.into(),
            kind: NodeKind::File {
                media_type,
                size_label: size_label.into(),
                content_ref,
            },
            created_label: created_label.into(),
            created_at: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder)
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn media_type(&self) -> Option<MediaType> {
        match &self.kind {
            NodeKind::File { media_type, .. } => Some(*media_type),
            NodeKind::Folder => None,
        }
    }

    pub fn size_label(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { size_label, .. } => Some(size_label),
            NodeKind::Folder => None,
        }
    }

    pub fn content_ref(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content_ref, .. } => content_ref.as_deref(),
            NodeKind::Folder => None,
        }
    }
}

// =============================================================================
// Derived views
// =============================================================================

/// Aggregate storage usage of all files in the vault.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub used_bytes: u64,
    pub used_label: String,
    pub limit_bytes: u64,
    pub limit_label: String,
    /// 0.0..=100.0
    pub percent_of_limit: f64,
}

/// Outcome of activating (clicking) an entry in a listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// A folder was entered
    Navigated(NodeId),
    /// A file was picked for preview or selection
    Selected(Node),
}

/// A client whose matter files get their own folder under "Clients".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRef {
    pub id: String,
    pub name: String,
    /// Pre-assigned vault folder, if the client already has one
    #[serde(default)]
    pub folder_id: Option<NodeId>,
}

impl ClientRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            folder_id: None,
        }
    }

    /// Vault folder id for this client (`client-<id>` unless pre-assigned).
    pub fn vault_folder_id(&self) -> NodeId {
        self.folder_id
            .clone()
            .unwrap_or_else(|| NodeId(format!("client-{}", self.id)))
    }
}
