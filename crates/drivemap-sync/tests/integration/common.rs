//! Shared test helpers
//!
//! [`FakeRemote`] is an in-memory implementation of the remote storage port
//! that records every listing and download it serves.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use drivemap_core::domain::{MappingRegistry, RemoteId};
use drivemap_core::ports::{IRemoteStorage, RemoteFolder, RemoteItem, FOLDER_MIME_TYPE};

pub fn rid(s: &str) -> RemoteId {
    RemoteId::new(s.to_string()).unwrap()
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Registry rooted at remote folder `R` mapped to `root`
pub fn registry_at(root: &Path) -> MappingRegistry {
    MappingRegistry::bootstrap(rid("R"), root.to_path_buf()).unwrap()
}

/// In-memory remote storage
#[derive(Default)]
pub struct FakeRemote {
    items: Mutex<Vec<RemoteItem>>,
    content: Mutex<HashMap<RemoteId, Vec<u8>>>,
    failing: Mutex<Vec<RemoteId>>,
    listings: Mutex<Vec<RemoteId>>,
    downloads: Mutex<Vec<RemoteId>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, id: &str, name: &str, parent: Option<&str>, mime: &str, modified: Option<DateTime<Utc>>) {
        self.items.lock().unwrap().push(RemoteItem {
            id: rid(id),
            name: name.to_string(),
            parents: parent.map(rid).into_iter().collect(),
            mime_type: mime.to_string(),
            modified,
            size: None,
            web_view_link: Some(format!("https://docs.example/{id}")),
        });
    }

    pub fn add_folder(&self, id: &str, name: &str, parent: &str) {
        self.push(id, name, Some(parent), FOLDER_MIME_TYPE, None);
    }

    /// A folder with no parents, e.g. the drive root itself
    pub fn add_top_folder(&self, id: &str, name: &str) {
        self.push(id, name, None, FOLDER_MIME_TYPE, None);
    }

    pub fn add_file(&self, id: &str, name: &str, parent: &str, modified: DateTime<Utc>, data: &[u8]) {
        self.push(id, name, Some(parent), "text/plain", Some(modified));
        self.content.lock().unwrap().insert(rid(id), data.to_vec());
    }

    pub fn add_native(&self, id: &str, name: &str, parent: &str, mime: &str, modified: DateTime<Utc>) {
        self.push(id, name, Some(parent), mime, Some(modified));
    }

    /// Makes every listing of `parent` fail
    pub fn fail_listing_of(&self, parent: &str) {
        self.failing.lock().unwrap().push(rid(parent));
    }

    /// Folders whose children were listed, in call order
    pub fn listings(&self) -> Vec<RemoteId> {
        self.listings.lock().unwrap().clone()
    }

    /// Files downloaded, in call order
    pub fn downloads(&self) -> Vec<RemoteId> {
        self.downloads.lock().unwrap().clone()
    }

    fn children(&self, parent: &RemoteId) -> anyhow::Result<Vec<RemoteItem>> {
        self.listings.lock().unwrap().push(parent.clone());
        if self.failing.lock().unwrap().contains(parent) {
            anyhow::bail!("simulated listing failure for {parent}");
        }
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.parents.contains(parent))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IRemoteStorage for FakeRemote {
    async fn list_child_folders(&self, parent: &RemoteId) -> anyhow::Result<Vec<RemoteFolder>> {
        Ok(self
            .children(parent)?
            .iter()
            .filter(|i| i.is_folder())
            .map(RemoteItem::as_folder)
            .collect())
    }

    async fn list_all_folders(&self) -> anyhow::Result<Vec<RemoteFolder>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.is_folder())
            .map(RemoteItem::as_folder)
            .collect())
    }

    async fn get_metadata(&self, id: &RemoteId) -> anyhow::Result<RemoteItem> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|i| &i.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Not found: {id}"))
    }

    async fn list_contents(&self, parent: &RemoteId) -> anyhow::Result<Vec<RemoteItem>> {
        self.children(parent)
    }

    async fn download(&self, id: &RemoteId) -> anyhow::Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(id.clone());
        self.content
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No content for {id}"))
    }

    async fn upload(&self, name: &str, _parent: &RemoteId, _data: &[u8]) -> anyhow::Result<RemoteItem> {
        anyhow::bail!("upload of {name} not supported by the fake")
    }

    async fn find_folders_by_name(
        &self,
        name: &str,
        parent: Option<&RemoteId>,
    ) -> anyhow::Result<Vec<RemoteFolder>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.is_folder() && i.name == name)
            .filter(|i| parent.map_or(true, |p| i.parents.contains(p)))
            .map(RemoteItem::as_folder)
            .collect())
    }
}
