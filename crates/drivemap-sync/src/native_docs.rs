//! Shortcut files for native documents
//!
//! Documents, spreadsheets and presentations have no byte content to
//! download. They are materialized as a small JSON file carrying the
//! browser link, named after the document plus `.gdoc`, `.gsheet` or
//! `.gslides`, which desktop clients open in the browser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use drivemap_core::domain::sanitize_component;
use drivemap_core::ports::RemoteItem;

/// Contents of a shortcut file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocShortcut {
    pub url: String,
    pub doc_id: String,
    pub resource_id: String,
}

impl DocShortcut {
    pub fn for_item(item: &RemoteItem) -> Self {
        Self {
            url: item.web_view_link.clone().unwrap_or_default(),
            doc_id: item.id.to_string(),
            resource_id: format!("document:{}", item.id),
        }
    }

    /// Serialized file contents
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Local path of a remote file inside `dir`
///
/// Native documents get their shortcut extension appended; other native
/// types (forms, drawings, ...) have no local representation and yield
/// `None`.
pub fn local_file_path(dir: &Path, item: &RemoteItem) -> Option<PathBuf> {
    let name = sanitize_component(&item.name);
    if !item.is_native() {
        return Some(dir.join(name));
    }
    item.native_extension()
        .map(|ext| dir.join(format!("{name}.{ext}")))
}
