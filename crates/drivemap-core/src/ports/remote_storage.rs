//! Remote storage port (driven/secondary port)
//!
//! This module defines the interface for interacting with the remote
//! hierarchical storage service. Folders and files are identified by opaque
//! IDs; a folder may list several parents but the mapping engine only ever
//! follows the first.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and don't need domain-level classification.
//! - Uses `#[async_trait]` for async trait methods.
//! - Pagination cursors are handled by the adapter; every listing method
//!   returns a single logical list.
//! - `RemoteFolder` and `RemoteItem` are port-level DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::RemoteId;

// ============================================================================
// MIME types
// ============================================================================

/// MIME type of remote folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Prefix shared by every native (non-downloadable) document type
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";

/// Native document types that get a local shortcut file, with its extension
pub const NATIVE_DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("application/vnd.google-apps.document", "gdoc"),
    ("application/vnd.google-apps.spreadsheet", "gsheet"),
    ("application/vnd.google-apps.presentation", "gslides"),
];

// ============================================================================
// DTOs
// ============================================================================

/// A remote folder as returned by child-folder listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    /// Folder ID
    pub id: RemoteId,
    /// Folder name as shown remotely (not unique, may contain '/')
    pub name: String,
    /// Parent folder IDs
    pub parents: Vec<RemoteId>,
}

impl RemoteFolder {
    /// First parent, the one the mapping engine follows
    pub fn primary_parent(&self) -> Option<&RemoteId> {
        self.parents.first()
    }
}

/// Full metadata of a remote file or folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Item ID
    pub id: RemoteId,
    /// Item name
    pub name: String,
    /// Parent folder IDs
    pub parents: Vec<RemoteId>,
    /// MIME type
    pub mime_type: String,
    /// Last modification time (None if the service did not report one)
    pub modified: Option<DateTime<Utc>>,
    /// Size in bytes (None for folders and native documents)
    pub size: Option<u64>,
    /// Browser link, used for native document shortcuts
    pub web_view_link: Option<String>,
}

impl RemoteItem {
    /// Returns true if this item is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Returns true for native types that cannot be downloaded as bytes
    pub fn is_native(&self) -> bool {
        !self.is_folder() && self.mime_type.starts_with(NATIVE_MIME_PREFIX)
    }

    /// Shortcut extension for native document types, `None` otherwise
    pub fn native_extension(&self) -> Option<&'static str> {
        NATIVE_DOCUMENT_TYPES
            .iter()
            .find(|(mime, _)| *mime == self.mime_type)
            .map(|(_, ext)| *ext)
    }

    /// Folder view of this item
    pub fn as_folder(&self) -> RemoteFolder {
        RemoteFolder {
            id: self.id.clone(),
            name: self.name.clone(),
            parents: self.parents.clone(),
        }
    }
}

// ============================================================================
// IRemoteStorage trait
// ============================================================================

/// Port trait for remote storage operations
///
/// ## Implementation Notes
///
/// - Implementations page through results transparently.
/// - Trashed items are never returned.
/// - Retrying of throttled requests is an adapter concern; any error that
///   reaches the caller aborts the current discovery or sync pass.
#[async_trait::async_trait]
pub trait IRemoteStorage: Send + Sync {
    /// Lists the immediate child folders of a folder
    ///
    /// # Arguments
    /// * `parent` - ID of the folder to list
    async fn list_child_folders(&self, parent: &RemoteId) -> anyhow::Result<Vec<RemoteFolder>>;

    /// Lists every folder of the drive in one paginated query
    async fn list_all_folders(&self) -> anyhow::Result<Vec<RemoteFolder>>;

    /// Gets the metadata of a single item
    ///
    /// # Arguments
    /// * `id` - Item ID (the alias "root" resolves to the drive root)
    async fn get_metadata(&self, id: &RemoteId) -> anyhow::Result<RemoteItem>;

    /// Lists the immediate contents (files and folders) of a folder
    async fn list_contents(&self, parent: &RemoteId) -> anyhow::Result<Vec<RemoteItem>>;

    /// Downloads a file's content by its remote ID
    ///
    /// # Returns
    /// The file contents as a byte vector
    async fn download(&self, id: &RemoteId) -> anyhow::Result<Vec<u8>>;

    /// Uploads a new file into a folder
    ///
    /// # Returns
    /// Metadata of the created file
    async fn upload(&self, name: &str, parent: &RemoteId, data: &[u8]) -> anyhow::Result<RemoteItem>;

    /// Finds folders by exact name, optionally restricted to one parent
    ///
    /// An absent folder (including a missing parent) yields an empty list,
    /// never an error.
    async fn find_folders_by_name(
        &self,
        name: &str,
        parent: Option<&RemoteId>,
    ) -> anyhow::Result<Vec<RemoteFolder>>;
}
