//! Local filesystem port (driven/secondary port)
//!
//! This module defines the interface the directory syncer uses to inspect
//! and materialize the local side of a mapping.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because filesystem errors are adapter-specific.
//! - All paths are expected to be absolute; mappings only hold absolute paths.
//! - `get_state` reports a missing path as `FileSystemState::not_found()`,
//!   never as an error.

use std::path::Path;

use chrono::{DateTime, Utc};

// ============================================================================
// FileSystemState struct
// ============================================================================

/// Snapshot of a path's state on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSystemState {
    /// Whether anything exists at the path
    pub exists: bool,
    /// Whether this is a directory
    pub is_dir: bool,
    /// Size in bytes (0 for directories or non-existent files)
    pub size: u64,
    /// Last modification time (None if not available or nothing exists)
    pub modified: Option<DateTime<Utc>>,
}

impl FileSystemState {
    /// Returns a state representing a non-existent path
    pub fn not_found() -> Self {
        Self {
            exists: false,
            is_dir: false,
            size: 0,
            modified: None,
        }
    }

    /// Returns true if something other than a directory exists at the path
    pub fn is_non_directory(&self) -> bool {
        self.exists && !self.is_dir
    }

    /// Returns true if the path exists and is a directory
    pub fn is_directory(&self) -> bool {
        self.exists && self.is_dir
    }
}

// ============================================================================
// ILocalFileSystem trait
// ============================================================================

/// Port trait for local filesystem operations
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Gets the current state of a file or directory
    ///
    /// Does not follow the final symlink; a dangling link counts as an
    /// existing non-directory.
    async fn get_state(&self, path: &Path) -> anyhow::Result<FileSystemState>;

    /// Creates a directory and all parent directories as needed
    async fn create_directory(&self, path: &Path) -> anyhow::Result<()>;

    /// Replaces a file's contents atomically, creating it if necessary
    ///
    /// Parent directories are NOT automatically created.
    async fn write_file(&self, path: &Path, data: &[u8]) -> anyhow::Result<()>;

    /// Sets a file's modification time
    async fn set_modified(&self, path: &Path, modified: DateTime<Utc>) -> anyhow::Result<()>;
}
