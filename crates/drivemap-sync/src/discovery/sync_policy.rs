//! Sync policies: the `sync` flag given to newly registered folders

use std::str::FromStr;
use std::sync::Arc;

use drivemap_core::domain::{sanitize_component, DirectoryMappingNode, IgnoreMatcher};
use drivemap_core::ports::RemoteFolder;

/// Decides the sync flag of a folder about to be registered under `parent`
pub trait SyncStrategy: Send + Sync {
    fn should_sync(&self, folder: &RemoteFolder, parent: &DirectoryMappingNode) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSync;

impl SyncStrategy for AlwaysSync {
    fn should_sync(&self, _folder: &RemoteFolder, _parent: &DirectoryMappingNode) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSync;

impl SyncStrategy for NeverSync {
    fn should_sync(&self, _folder: &RemoteFolder, _parent: &DirectoryMappingNode) -> bool {
        false
    }
}

/// Copies the parent's sync flag
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritSync;

impl SyncStrategy for InheritSync {
    fn should_sync(&self, _folder: &RemoteFolder, parent: &DirectoryMappingNode) -> bool {
        parent.sync()
    }
}

/// Syncs unless the folder's would-be local path is ignored
#[derive(Debug, Clone)]
pub struct SyncIfNotIgnored {
    ignorer: Arc<IgnoreMatcher>,
}

impl SyncIfNotIgnored {
    pub fn new(ignorer: Arc<IgnoreMatcher>) -> Self {
        Self { ignorer }
    }
}

impl SyncStrategy for SyncIfNotIgnored {
    fn should_sync(&self, folder: &RemoteFolder, parent: &DirectoryMappingNode) -> bool {
        let path = parent.local_path().join(sanitize_component(&folder.name));
        !self.ignorer.is_ignored(&path)
    }
}

// ============================================================================
// Named policies (configuration / CLI)
// ============================================================================

/// The `discovery.new_folders` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewFolderPolicy {
    Always,
    Never,
    Inherit,
    UnlessIgnored,
}

impl NewFolderPolicy {
    /// Builds the matching strategy; `UnlessIgnored` needs an ignorer
    pub fn into_strategy(self, ignorer: Option<Arc<IgnoreMatcher>>) -> Box<dyn SyncStrategy> {
        match (self, ignorer) {
            (Self::Always, _) => Box::new(AlwaysSync),
            (Self::Never, _) => Box::new(NeverSync),
            (Self::Inherit, _) => Box::new(InheritSync),
            (Self::UnlessIgnored, Some(ignorer)) => Box::new(SyncIfNotIgnored::new(ignorer)),
            (Self::UnlessIgnored, None) => Box::new(AlwaysSync),
        }
    }
}

impl FromStr for NewFolderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "inherit" => Ok(Self::Inherit),
            "unless_ignored" => Ok(Self::UnlessIgnored),
            other => Err(format!(
                "unknown new-folder policy '{other}', expected always, never, inherit or unless_ignored"
            )),
        }
    }
}
