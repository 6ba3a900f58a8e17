//! Paginated `files.list` queries
//!
//! Every listing goes through [`list_files`], which follows `nextPageToken`
//! until the last page and returns one logical list. The query builders
//! below produce the `q` expressions for the listings the port needs.

use chrono::{DateTime, Utc};
use drivemap_core::domain::newtypes::RemoteId;
use drivemap_core::ports::remote_storage::{RemoteFolder, RemoteItem, FOLDER_MIME_TYPE};
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use crate::client::DriveClient;
use crate::RemoteError;

/// Fields requested for every file resource
pub const FILE_FIELDS: &str = "id,name,parents,mimeType,modifiedTime,size,webViewLink";

/// Upper bound on followed pages, guards against a server that never stops paging
const MAX_PAGES: u32 = 10_000;

// ============================================================================
// Drive API response types (JSON deserialization)
// ============================================================================

/// One page of a `files.list` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    /// Files on this page
    #[serde(default)]
    files: Vec<DriveFile>,
    /// Cursor for the next page (absent on the last page)
    next_page_token: Option<String>,
}

/// A file resource as returned by the Drive API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID
    pub id: String,
    /// File name
    #[serde(default)]
    pub name: String,
    /// Parent folder IDs
    #[serde(default)]
    pub parents: Vec<String>,
    /// MIME type
    #[serde(default)]
    pub mime_type: String,
    /// Last modification time (RFC 3339)
    pub modified_time: Option<DateTime<Utc>>,
    /// Size in bytes; the API encodes it as a decimal string
    pub size: Option<String>,
    /// Browser link
    pub web_view_link: Option<String>,
}

impl DriveFile {
    /// Converts into the port-level item
    ///
    /// # Errors
    /// Returns `InvalidResponse` if an ID is empty or malformed
    pub fn into_item(self) -> Result<RemoteItem, RemoteError> {
        let size = self.size.as_deref().and_then(|s| s.parse::<u64>().ok());
        Ok(RemoteItem {
            id: parse_id(self.id)?,
            parents: self
                .parents
                .into_iter()
                .map(parse_id)
                .collect::<Result<_, _>>()?,
            name: self.name,
            mime_type: self.mime_type,
            modified: self.modified_time,
            size,
            web_view_link: self.web_view_link,
        })
    }

    /// Converts into the port-level folder
    ///
    /// # Errors
    /// Returns `InvalidResponse` if an ID is empty or malformed
    pub fn into_folder(self) -> Result<RemoteFolder, RemoteError> {
        Ok(RemoteFolder {
            id: parse_id(self.id)?,
            parents: self
                .parents
                .into_iter()
                .map(parse_id)
                .collect::<Result<_, _>>()?,
            name: self.name,
        })
    }
}

fn parse_id(id: String) -> Result<RemoteId, RemoteError> {
    RemoteId::new(id).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}

// ============================================================================
// Query builders
// ============================================================================

/// Escapes a value for use inside a single-quoted query string
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Immediate, non-trashed child folders of `parent`
pub fn child_folders_query(parent: &RemoteId) -> String {
    format!(
        "'{}' in parents and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false",
        escape_query_value(parent.as_str())
    )
}

/// Every non-trashed folder of the drive
pub fn all_folders_query() -> String {
    format!("mimeType = '{FOLDER_MIME_TYPE}' and trashed = false")
}

/// Immediate, non-trashed contents of `parent`
pub fn contents_query(parent: &RemoteId) -> String {
    format!(
        "'{}' in parents and trashed = false",
        escape_query_value(parent.as_str())
    )
}

/// Non-trashed folders named exactly `name`, optionally under `parent`
pub fn folders_by_name_query(name: &str, parent: Option<&RemoteId>) -> String {
    let mut query = format!(
        "name = '{}' and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false",
        escape_query_value(name)
    );
    if let Some(parent) = parent {
        query.push_str(&format!(
            " and '{}' in parents",
            escape_query_value(parent.as_str())
        ));
    }
    query
}

// ============================================================================
// Listing
// ============================================================================

/// Runs a `files.list` query, following every page
///
/// # Arguments
/// * `client` - Authenticated client
/// * `query` - The `q` expression
///
/// # Returns
/// Every file resource matched by the query, in server order
pub async fn list_files(client: &DriveClient, query: &str) -> Result<Vec<DriveFile>, RemoteError> {
    let fields = format!("nextPageToken,files({FILE_FIELDS})");
    let page_size = client.page_size().to_string();
    let mut files = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages: u32 = 0;

    loop {
        let response = client
            .send_with_retry(|| {
                let mut params = vec![
                    ("q", query),
                    ("fields", fields.as_str()),
                    ("pageSize", page_size.as_str()),
                ];
                if let Some(token) = page_token.as_deref() {
                    params.push(("pageToken", token));
                }
                client.request(Method::GET, "/files").query(&params)
            })
            .await?;

        let page: FileListPage = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("files.list page: {e}")))?;

        pages += 1;
        files.extend(page.files);

        match page.next_page_token {
            Some(token) if pages < MAX_PAGES => page_token = Some(token),
            Some(_) => {
                return Err(RemoteError::InvalidResponse(format!(
                    "files.list did not finish after {MAX_PAGES} pages"
                )))
            }
            None => break,
        }
    }

    debug!(query, pages, files = files.len(), "files.list complete");
    Ok(files)
}
