//! DriveRemoteStorage - IRemoteStorage implementation for the Drive API
//!
//! Wraps the [`DriveClient`] and delegates to the listing module to fulfil
//! the [`IRemoteStorage`] port contract.
//!
//! ## Design Notes
//!
//! - `find_folders_by_name` maps a 404 to an empty result so callers can
//!   tell "absent" apart from "failed".
//! - Uploads are two requests: create the metadata, then send the bytes to
//!   the media endpoint of the new file.

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use tracing::debug;

use drivemap_core::domain::newtypes::RemoteId;
use drivemap_core::ports::remote_storage::{IRemoteStorage, RemoteFolder, RemoteItem};

use crate::client::DriveClient;
use crate::listing::{self, DriveFile, FILE_FIELDS};
use crate::RemoteError;

/// Metadata body for file creation
#[derive(Debug, Serialize)]
struct CreateFileRequest<'a> {
    name: &'a str,
    parents: [&'a str; 1],
}

/// Remote storage implementation backed by the Drive REST API
#[derive(Debug, Clone)]
pub struct DriveRemoteStorage {
    client: DriveClient,
}

impl DriveRemoteStorage {
    /// Creates a new `DriveRemoteStorage` wrapping the given [`DriveClient`]
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// The wrapped client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    async fn get_file(&self, id: &RemoteId) -> Result<DriveFile, RemoteError> {
        let path = format!("/files/{}", id.as_str());
        let response = self
            .client
            .send_with_retry(|| {
                self.client
                    .request(Method::GET, &path)
                    .query(&[("fields", FILE_FIELDS)])
            })
            .await?;
        response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(format!("files.get {id}: {e}")))
    }
}

#[async_trait::async_trait]
impl IRemoteStorage for DriveRemoteStorage {
    async fn list_child_folders(&self, parent: &RemoteId) -> Result<Vec<RemoteFolder>> {
        debug!(parent = %parent, "DriveRemoteStorage::list_child_folders");
        let files = listing::list_files(&self.client, &listing::child_folders_query(parent))
            .await
            .with_context(|| format!("Failed to list child folders of {parent}"))?;
        Ok(files
            .into_iter()
            .map(DriveFile::into_folder)
            .collect::<Result<_, _>>()?)
    }

    async fn list_all_folders(&self) -> Result<Vec<RemoteFolder>> {
        debug!("DriveRemoteStorage::list_all_folders");
        let files = listing::list_files(&self.client, &listing::all_folders_query())
            .await
            .context("Failed to list all folders")?;
        Ok(files
            .into_iter()
            .map(DriveFile::into_folder)
            .collect::<Result<_, _>>()?)
    }

    /// Makes `GET /files/{id}` and converts the response to a [`RemoteItem`]
    async fn get_metadata(&self, id: &RemoteId) -> Result<RemoteItem> {
        debug!(id = %id, "DriveRemoteStorage::get_metadata");
        let file = self
            .get_file(id)
            .await
            .with_context(|| format!("Failed to get metadata of {id}"))?;
        Ok(file.into_item()?)
    }

    async fn list_contents(&self, parent: &RemoteId) -> Result<Vec<RemoteItem>> {
        debug!(parent = %parent, "DriveRemoteStorage::list_contents");
        let files = listing::list_files(&self.client, &listing::contents_query(parent))
            .await
            .with_context(|| format!("Failed to list contents of {parent}"))?;
        Ok(files
            .into_iter()
            .map(DriveFile::into_item)
            .collect::<Result<_, _>>()?)
    }

    /// Makes `GET /files/{id}?alt=media` which returns the raw file bytes
    async fn download(&self, id: &RemoteId) -> Result<Vec<u8>> {
        let path = format!("/files/{}", id.as_str());
        debug!(id = %id, "Downloading file");

        let response = self
            .client
            .send_with_retry(|| {
                self.client
                    .request(Method::GET, &path)
                    .query(&[("alt", "media")])
            })
            .await
            .with_context(|| format!("Failed to download {id}"))?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read download response body")?;

        debug!(id = %id, bytes = bytes.len(), "Downloaded file");
        Ok(bytes.to_vec())
    }

    async fn upload(&self, name: &str, parent: &RemoteId, data: &[u8]) -> Result<RemoteItem> {
        debug!(name, parent = %parent, size = data.len(), "DriveRemoteStorage::upload");

        let body = CreateFileRequest {
            name,
            parents: [parent.as_str()],
        };
        let created: DriveFile = self
            .client
            .send_with_retry(|| {
                self.client
                    .request(Method::POST, "/files")
                    .query(&[("fields", FILE_FIELDS)])
                    .json(&body)
            })
            .await
            .with_context(|| format!("Failed to create {name} in {parent}"))?
            .json()
            .await
            .context("Failed to parse file creation response")?;

        let path = format!("/files/{}", created.id);
        let uploaded: DriveFile = self
            .client
            .send_with_retry(|| {
                self.client
                    .upload_request(Method::PATCH, &path)
                    .query(&[("uploadType", "media"), ("fields", FILE_FIELDS)])
                    .body(data.to_vec())
            })
            .await
            .with_context(|| format!("Failed to upload content of {name}"))?
            .json()
            .await
            .context("Failed to parse media upload response")?;

        Ok(uploaded.into_item()?)
    }

    async fn find_folders_by_name(
        &self,
        name: &str,
        parent: Option<&RemoteId>,
    ) -> Result<Vec<RemoteFolder>> {
        debug!(name, parent = ?parent.map(RemoteId::as_str), "DriveRemoteStorage::find_folders_by_name");
        let files = match listing::list_files(&self.client, &listing::folders_by_name_query(name, parent)).await {
            Ok(files) => files,
            Err(e) if e.is_not_found() => {
                debug!(name, "Folder lookup returned 404, treating as absent");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to find folders named {name}")),
        };
        Ok(files
            .into_iter()
            .map(DriveFile::into_folder)
            .collect::<Result<_, _>>()?)
    }
}
