//! Persisted mapping file
//!
//! The registry is stored as a flat JSON object keyed by remote ID. The
//! distinguished key `"root"` holds the root's remote ID as a string value:
//!
//! ```json
//! {
//!   "root": "R",
//!   "R": { "remoteName": "root", "parents": [], "localPath": "/sync", "sync": true },
//!   "A": { "remoteName": "docs", "parents": ["R"], "localPath": "/sync/docs", "sync": true }
//! }
//! ```
//!
//! Loading rebuilds the tree depth-first from the root after bucketing
//! entries by parent ID in one pass. `subdirs_up_to_date` is not persisted,
//! so every loaded node starts out as not fully discovered.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::errors::MappingError;
use super::mapping::MappingRegistry;
use super::newtypes::RemoteId;

/// Key holding the root's remote ID
pub const ROOT_KEY: &str = "root";

/// Errors that can occur while loading or persisting the map file
#[derive(Debug, Error)]
pub enum MapFileError {
    /// Reading or writing the file failed
    #[error("I/O error on map file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON of the expected shape
    #[error("Map file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An entry is missing required data
    #[error("Malformed map file entry: {0}")]
    Malformed(String),

    /// Rebuilding the registry violated a mapping invariant
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// One persisted mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Local directory name (the literal `"root"` for the root entry)
    #[serde(rename = "remoteName", default)]
    pub remote_name: Option<String>,

    /// Parent remote IDs; empty for the root, one element otherwise
    #[serde(default)]
    pub parents: Vec<String>,

    /// Absolute local path
    #[serde(rename = "localPath", default)]
    pub local_path: Option<String>,

    /// Sync flag
    #[serde(default)]
    pub sync: Option<bool>,
}

/// In-memory form of the map file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapFile {
    /// Root remote ID
    pub root: String,

    /// Every mapping keyed by remote ID, root included
    #[serde(flatten)]
    pub entries: BTreeMap<String, MapEntry>,
}

impl MapFile {
    /// Builds the persisted form of a registry
    ///
    /// # Errors
    /// Returns `Malformed` if a remote ID collides with the `"root"` key
    pub fn from_registry(registry: &MappingRegistry) -> Result<Self, MapFileError> {
        let mut entries = BTreeMap::new();
        let root = registry.root_node();
        if root.remote_id().as_str() == ROOT_KEY {
            return Err(MapFileError::Malformed(format!(
                "remote ID {ROOT_KEY} collides with the root key"
            )));
        }
        entries.insert(
            root.remote_id().to_string(),
            MapEntry {
                remote_name: Some(ROOT_KEY.to_string()),
                parents: Vec::new(),
                local_path: Some(root.local_path().display().to_string()),
                sync: Some(root.sync()),
            },
        );

        for id in registry.walk(registry.root()).into_iter().skip(1) {
            let Some(node) = registry.node(id) else { continue };
            if node.remote_id().as_str() == ROOT_KEY {
                return Err(MapFileError::Malformed(format!(
                    "remote ID {ROOT_KEY} collides with the root key"
                )));
            }
            let parents = node
                .parent()
                .and_then(|p| registry.node(p))
                .map(|p| vec![p.remote_id().to_string()])
                .unwrap_or_default();
            entries.insert(
                node.remote_id().to_string(),
                MapEntry {
                    remote_name: Some(node.name()),
                    parents,
                    local_path: Some(node.local_path().display().to_string()),
                    sync: Some(node.sync()),
                },
            );
        }

        Ok(Self {
            root: root.remote_id().to_string(),
            entries,
        })
    }

    /// Rebuilds a registry from the persisted form
    ///
    /// Entries whose parent chain never reaches the root are skipped with a
    /// warning. Entries with several parents are attached to the first one.
    ///
    /// # Errors
    /// - `Malformed` if the root entry is missing or an entry lacks both a
    ///   local path and a name, or lacks its sync flag
    /// - `Mapping` if an ID is invalid or a path is not absolute
    pub fn into_registry(self) -> Result<MappingRegistry, MapFileError> {
        let root_id = RemoteId::new(self.root.clone())?;
        let root_entry = self.entries.get(&self.root).ok_or_else(|| {
            MapFileError::Malformed(format!("root {} has no entry", self.root))
        })?;
        let root_path = root_entry.local_path.as_deref().ok_or_else(|| {
            MapFileError::Malformed(format!("root {} has no localPath", self.root))
        })?;

        let mut registry = MappingRegistry::bootstrap(root_id.clone(), PathBuf::from(root_path))?;
        registry.set_sync(&root_id, root_entry.sync.unwrap_or(true))?;

        // Single bucketing pass keyed by parent ID
        let mut by_parent: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (key, entry) in &self.entries {
            if *key == self.root {
                continue;
            }
            match entry.parents.as_slice() {
                [] => warn!(remote_id = %key, "Map file entry has no parent, skipping"),
                [parent] => by_parent.entry(parent.as_str()).or_default().push(key.as_str()),
                [parent, ..] => {
                    warn!(remote_id = %key, parent = %parent, "Map file entry has several parents, using the first");
                    by_parent.entry(parent.as_str()).or_default().push(key.as_str());
                }
            }
        }

        let mut visited = HashSet::new();
        let mut stack = vec![self.root.as_str()];
        while let Some(parent_key) = stack.pop() {
            let Some(children) = by_parent.get(parent_key) else { continue };
            let parent_id = RemoteId::new(parent_key.to_string())?;
            let parent_path = registry
                .lookup_by_id(&parent_id)
                .map(|p| p.local_path().to_path_buf())
                .ok_or_else(|| {
                    MappingError::IllegalState(format!("{parent_key} was expanded but not registered"))
                })?;

            for child_key in children.iter().rev() {
                if !visited.insert(*child_key) {
                    continue;
                }
                let Some(entry) = self.entries.get(*child_key) else { continue };
                let local_path = match (&entry.local_path, &entry.remote_name) {
                    (Some(path), _) => PathBuf::from(path),
                    (None, Some(name)) => parent_path.join(name),
                    (None, None) => {
                        return Err(MapFileError::Malformed(format!(
                            "{child_key} has neither localPath nor remoteName"
                        )))
                    }
                };
                let sync = entry.sync.ok_or_else(|| {
                    MapFileError::Malformed(format!("{child_key} has no sync flag"))
                })?;

                registry.register(RemoteId::new(child_key.to_string())?, local_path, sync, &parent_id)?;
                stack.push(*child_key);
            }
        }

        for key in self.entries.keys() {
            if *key != self.root && !visited.contains(key.as_str()) {
                warn!(remote_id = %key, "Map file entry is not reachable from the root, skipping");
            }
        }

        Ok(registry)
    }

    /// Parses the JSON text of a map file
    ///
    /// # Errors
    /// Returns `Json` if the text is not a valid map file
    pub fn from_json(text: &str) -> Result<Self, MapFileError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pretty-printed JSON text
    ///
    /// # Errors
    /// Returns `Json` if serialization fails
    pub fn to_json_pretty(&self) -> Result<String, MapFileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a registry from a map file on disk
    ///
    /// # Errors
    /// See [`into_registry`](Self::into_registry); also `Io` and `Json`
    pub fn load(path: &Path) -> Result<MappingRegistry, MapFileError> {
        let text = fs::read_to_string(path)?;
        let registry = Self::from_json(&text)?.into_registry()?;
        debug!(path = %path.display(), mappings = registry.len(), "Loaded map file");
        Ok(registry)
    }

    /// Writes the whole registry to `path`
    ///
    /// The file is written to a sibling temporary file and renamed into place,
    /// so a crash never leaves a truncated map file behind. Calling this after
    /// a partial discovery pass is safe: the file always mirrors the tree.
    ///
    /// # Errors
    /// Returns `Io` or `Json` on failure, `Malformed` if the registry cannot
    /// be represented; the previous file is left untouched
    pub fn persist(registry: &MappingRegistry, path: &Path) -> Result<(), MapFileError> {
        let json = Self::from_registry(registry)?.to_json_pretty()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, path)?;

        debug!(path = %path.display(), mappings = registry.len(), "Persisted map file");
        Ok(())
    }

    /// "Is configured": the map file exists and parses into a registry
    pub fn is_configured(path: &Path) -> bool {
        path.is_file() && Self::load(path).is_ok()
    }
}
