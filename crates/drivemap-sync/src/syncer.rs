//! Pull synchronization of one mapped directory
//!
//! ## Sync Flow
//!
//! 1. List the remote folder's immediate contents
//! 2. Split folders from files; the folder itself goes first as `.` so its
//!    local directory exists before any file is written
//! 3. Create the local directory of every synced subfolder, registering
//!    unknown ones (synced by default); a pre-existing mapping flagged
//!    `sync = false` is left alone
//! 4. Download every file that is missing locally or strictly older than
//!    its remote copy, then stamp it with the remote modification time
//! 5. Persist the registry if new mappings were created
//!
//! Uploading local changes is not done here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument};

use drivemap_core::domain::{sanitize_component, MapFile, MappingError, MappingRegistry, RemoteId};
use drivemap_core::ports::{ILocalFileSystem, IRemoteStorage, RemoteItem};

use crate::native_docs::{self, DocShortcut};
use crate::SyncError;

/// Summary of one directory sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Local directories created
    pub directories_created: usize,
    /// Mappings registered while creating directories
    pub mappings_created: usize,
    /// Subfolders skipped because their mapping is not synced
    pub unsynced_skipped: usize,
    /// Files downloaded
    pub files_downloaded: usize,
    /// Native document shortcuts written
    pub shortcuts_written: usize,
    /// Files already up to date
    pub files_up_to_date: usize,
    /// Remote files with no local representation
    pub files_skipped: usize,
}

impl SyncReport {
    /// Adds another report's counters to this one
    pub fn absorb(&mut self, other: &SyncReport) {
        self.directories_created += other.directories_created;
        self.mappings_created += other.mappings_created;
        self.unsynced_skipped += other.unsynced_skipped;
        self.files_downloaded += other.files_downloaded;
        self.shortcuts_written += other.shortcuts_written;
        self.files_up_to_date += other.files_up_to_date;
        self.files_skipped += other.files_skipped;
    }
}

/// Pulls one mapped directory from the remote
#[derive(Clone)]
pub struct DirectorySyncer {
    remote: Arc<dyn IRemoteStorage>,
    local: Arc<dyn ILocalFileSystem>,
    map_file: Option<PathBuf>,
}

impl DirectorySyncer {
    pub fn new(remote: Arc<dyn IRemoteStorage>, local: Arc<dyn ILocalFileSystem>) -> Self {
        Self {
            remote,
            local,
            map_file: None,
        }
    }

    /// Persists the registry to `path` whenever a sync creates mappings
    pub fn with_map_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.map_file = Some(path.into());
        self
    }

    /// Synchronizes the mapped folder `remote_id`
    ///
    /// # Errors
    /// - `Mapping(InvalidArgument)` if the folder is not mapped or not synced
    /// - `Mapping(IllegalState)` if a non-directory occupies a directory's path
    /// - `Remote` / `Io` on remote or local failures
    #[instrument(skip(self, registry), fields(folder = %remote_id))]
    pub async fn sync_directory(
        &self,
        registry: &mut MappingRegistry,
        remote_id: &RemoteId,
    ) -> Result<SyncReport, SyncError> {
        let node = registry.lookup_by_id(remote_id).ok_or_else(|| {
            MappingError::InvalidArgument(format!("Folder {remote_id} is not mapped"))
        })?;
        if !node.sync() {
            return Err(MappingError::InvalidArgument(format!(
                "Folder {remote_id} is not flagged for sync"
            ))
            .into());
        }
        let dir = node.local_path().to_path_buf();
        debug!(path = %dir.display(), "Syncing directory");

        let contents = self
            .remote
            .list_contents(remote_id)
            .await
            .map_err(SyncError::Remote)?;
        let (folders, files): (Vec<RemoteItem>, Vec<RemoteItem>) =
            contents.into_iter().partition(RemoteItem::is_folder);

        let mut report = SyncReport::default();

        // The folder itself first.
        self.ensure_directory(&dir, &mut report).await?;
        self.create_subdirectories(registry, remote_id, &dir, &folders, &mut report)
            .await?;
        for file in &files {
            self.sync_file(&dir, file, &mut report).await?;
        }

        if report.mappings_created > 0 {
            if let Some(path) = &self.map_file {
                MapFile::persist(registry, path)?;
                debug!(path = %path.display(), "Persisted new mappings");
            }
        }

        info!(
            downloaded = report.files_downloaded,
            shortcuts = report.shortcuts_written,
            up_to_date = report.files_up_to_date,
            directories = report.directories_created,
            "Directory synced"
        );
        Ok(report)
    }

    async fn create_subdirectories(
        &self,
        registry: &mut MappingRegistry,
        parent_id: &RemoteId,
        parent_dir: &Path,
        folders: &[RemoteItem],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        for folder in folders {
            let path = match registry.lookup_by_id(&folder.id) {
                Some(mapping) if !mapping.sync() => {
                    debug!(folder = %folder.id, "Not creating un-synced directory");
                    report.unsynced_skipped += 1;
                    continue;
                }
                Some(mapping) => mapping.local_path().to_path_buf(),
                None => {
                    let path = parent_dir.join(sanitize_component(&folder.name));
                    registry.register(folder.id.clone(), path.clone(), true, parent_id)?;
                    report.mappings_created += 1;
                    path
                }
            };
            self.ensure_directory(&path, report).await?;
        }
        Ok(())
    }

    async fn ensure_directory(&self, path: &Path, report: &mut SyncReport) -> Result<(), SyncError> {
        let state = self.local.get_state(path).await.map_err(SyncError::Io)?;
        if state.is_directory() {
            return Ok(());
        }
        if state.is_non_directory() {
            error!(path = %path.display(), "A file occupies the path of a synced directory");
            return Err(MappingError::IllegalState(format!(
                "Can't create local directory {}: a file of the same name already exists",
                path.display()
            ))
            .into());
        }

        debug!(path = %path.display(), "Creating local directory");
        self.local.create_directory(path).await.map_err(SyncError::Io)?;
        report.directories_created += 1;
        Ok(())
    }

    async fn sync_file(&self, dir: &Path, file: &RemoteItem, report: &mut SyncReport) -> Result<(), SyncError> {
        let Some(path) = native_docs::local_file_path(dir, file) else {
            debug!(file = %file.id, mime = %file.mime_type, "No local representation, skipping");
            report.files_skipped += 1;
            return Ok(());
        };

        let state = self.local.get_state(&path).await.map_err(SyncError::Io)?;
        let stale = match (state.exists, state.modified, file.modified) {
            (false, _, _) => true,
            (true, Some(local), Some(remote)) => remote > local,
            (true, None, Some(_)) => true,
            (true, _, None) => false,
        };
        if !stale {
            debug!(path = %path.display(), "Already up to date");
            report.files_up_to_date += 1;
            return Ok(());
        }

        if file.is_native() {
            let shortcut = DocShortcut::for_item(file)
                .to_bytes()
                .map_err(|e| SyncError::Io(e.into()))?;
            debug!(path = %path.display(), doc = %file.id, "Writing document shortcut");
            self.local.write_file(&path, &shortcut).await.map_err(SyncError::Io)?;
            report.shortcuts_written += 1;
        } else {
            debug!(path = %path.display(), file = %file.id, "Downloading");
            let data = self.remote.download(&file.id).await.map_err(SyncError::Remote)?;
            self.local.write_file(&path, &data).await.map_err(SyncError::Io)?;
            report.files_downloaded += 1;
        }

        if let Some(modified) = file.modified {
            self.local
                .set_modified(&path, modified)
                .await
                .map_err(SyncError::Io)?;
        }
        Ok(())
    }
}
