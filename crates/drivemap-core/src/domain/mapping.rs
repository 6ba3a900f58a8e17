//! Directory mapping tree and registry
//!
//! A [`DirectoryMappingNode`] binds one remote folder ID to one absolute local
//! path. The [`MappingRegistry`] owns every node in an arena and keeps a flat
//! `RemoteId -> NodeId` index next to the tree, so nodes are referenced by
//! handle from both the parent's child list and the index.
//!
//! ## Invariants
//!
//! - Every node reachable from the root is in the index and vice versa
//! - No two nodes share a remote ID
//! - A non-root node's local path is its parent's path plus one component
//!   at the time it was registered (remapping rebases descendants)
//! - Node fields only change through the registry's API

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::errors::MappingError;
use super::newtypes::{sanitize_component, RemoteId};

/// Handle to a node inside a [`MappingRegistry`]
///
/// A handle stays valid until its node is unregistered. Slots freed by
/// [`MappingRegistry::unregister`] are reused by later registrations, so a
/// handle must not be kept across the removal of its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Raw arena slot, mostly useful for logging
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A mapping between one remote folder and one local directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryMappingNode {
    remote_id: RemoteId,
    local_path: PathBuf,
    sync: bool,
    subdirs_up_to_date: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl DirectoryMappingNode {
    fn new(remote_id: RemoteId, local_path: PathBuf, sync: bool, parent: Option<NodeId>) -> Self {
        Self {
            remote_id,
            local_path,
            sync,
            subdirs_up_to_date: false,
            parent,
            children: Vec::new(),
        }
    }

    /// Remote folder ID
    pub fn remote_id(&self) -> &RemoteId {
        &self.remote_id
    }

    /// Absolute local directory path
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Whether the contents of this folder are materialized locally
    pub fn sync(&self) -> bool {
        self.sync
    }

    /// True iff every descendant folder has been fetched and registered
    pub fn subdirs_up_to_date(&self) -> bool {
        self.subdirs_up_to_date
    }

    /// Parent handle, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in registration order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Last component of the local path
    pub fn name(&self) -> String {
        self.local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.local_path.display().to_string())
    }
}

/// Result of a [`MappingRegistry::register`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A new node was added under the parent
    Created(NodeId),
    /// An existing child of the same parent was remapped in place
    Updated(NodeId),
}

impl RegisterOutcome {
    /// Handle of the created or updated node
    pub fn node_id(self) -> NodeId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }

    /// True if a new node was created
    pub fn is_created(self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Owner of the mapping tree and its flat remote-ID index
#[derive(Debug, Clone)]
pub struct MappingRegistry {
    nodes: Vec<Option<DirectoryMappingNode>>,
    free: Vec<NodeId>,
    index: HashMap<RemoteId, NodeId>,
    root: NodeId,
}

impl MappingRegistry {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Bootstraps a single-node registry from a root remote ID and local path
    ///
    /// # Errors
    /// Returns `InvalidPath` if `local_root` is not absolute
    pub fn bootstrap(root_id: RemoteId, local_root: impl Into<PathBuf>) -> Result<Self, MappingError> {
        let local_root = local_root.into();
        ensure_absolute(&local_root)?;

        let root = NodeId(0);
        let mut index = HashMap::new();
        index.insert(root_id.clone(), root);

        debug!(remote_id = %root_id, path = %local_root.display(), "Bootstrapped mapping root");

        Ok(Self {
            nodes: vec![Some(DirectoryMappingNode::new(root_id, local_root, true, None))],
            free: Vec::new(),
            index,
            root,
        })
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Handle of the root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root node
    pub fn root_node(&self) -> &DirectoryMappingNode {
        match self.node(self.root) {
            Some(node) => node,
            None => unreachable!("the root slot is never freed"),
        }
    }

    /// Node behind a handle, `None` if the handle was unregistered
    pub fn node(&self, id: NodeId) -> Option<&DirectoryMappingNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Handle of a mapped remote ID (O(1))
    pub fn handle(&self, remote_id: &RemoteId) -> Option<NodeId> {
        self.index.get(remote_id).copied()
    }

    /// Node mapped to a remote ID (O(1))
    pub fn lookup_by_id(&self, remote_id: &RemoteId) -> Option<&DirectoryMappingNode> {
        self.handle(remote_id).and_then(|id| self.node(id))
    }

    /// Node mapped to a local path (scans the index)
    pub fn lookup_by_path(&self, local_path: &Path) -> Option<&DirectoryMappingNode> {
        self.index
            .values()
            .filter_map(|id| self.node(*id))
            .find(|node| node.local_path == local_path)
    }

    /// Whether a remote ID is mapped
    pub fn is_mapped(&self, remote_id: &RemoteId) -> bool {
        self.index.contains_key(remote_id)
    }

    /// Number of mapped folders, root included
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Always false: the root is never removed
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Parent node of a mapped folder, `None` for the root or an unknown ID
    pub fn parent_of(&self, remote_id: &RemoteId) -> Option<&DirectoryMappingNode> {
        self.lookup_by_id(remote_id)
            .and_then(|node| node.parent)
            .and_then(|parent| self.node(parent))
    }

    /// Child of `parent` whose local directory name matches `name` once sanitised
    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let wanted = sanitize_component(name);
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|child| {
                self.node(*child)
                    .and_then(|n| n.local_path.file_name())
                    .is_some_and(|n| n.to_string_lossy() == wanted)
            })
    }

    /// Depth of a node below the root (root = 0)
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.node(id)?;
        while let Some(parent) = current.parent {
            depth += 1;
            current = self.node(parent)?;
        }
        Some(depth)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers `remote_id` at `local_path` under the mapped folder `parent_id`
    ///
    /// If `remote_id` is already a child of `parent_id` it is remapped in
    /// place: path and sync flag are replaced, children are kept and their
    /// paths rebased onto the new location.
    ///
    /// # Errors
    /// - `InvalidArgument` if `parent_id` is not registered
    /// - `InvalidPath` if `local_path` is not absolute
    /// - `UnsupportedOperation` if `remote_id` is registered under another parent
    pub fn register(
        &mut self,
        remote_id: RemoteId,
        local_path: impl Into<PathBuf>,
        sync: bool,
        parent_id: &RemoteId,
    ) -> Result<RegisterOutcome, MappingError> {
        let local_path = local_path.into();
        let parent = self.handle(parent_id).ok_or_else(|| {
            MappingError::InvalidArgument(format!(
                "Parent mapping {parent_id} is not registered, must supply a registered parent"
            ))
        })?;
        ensure_absolute(&local_path)?;

        if let Some(existing) = self.handle(&remote_id) {
            if self.live(existing)?.parent != Some(parent) {
                return Err(MappingError::UnsupportedOperation(format!(
                    "Remapping {remote_id} under a different parent ({parent_id}) is not supported"
                )));
            }

            let old_path = {
                let node = self.live_mut(existing)?;
                node.sync = sync;
                std::mem::replace(&mut node.local_path, local_path.clone())
            };
            if old_path != local_path {
                self.rebase_descendants(existing, &old_path, &local_path);
            }

            debug!(remote_id = %remote_id, path = %local_path.display(), sync, "Remapped folder");
            return Ok(RegisterOutcome::Updated(existing));
        }

        debug!(remote_id = %remote_id, path = %local_path.display(), sync, "Mapped folder");
        let node = DirectoryMappingNode::new(remote_id.clone(), local_path, sync, Some(parent));
        let id = match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        self.index.insert(remote_id, id);
        self.live_mut(parent)?.children.push(id);

        Ok(RegisterOutcome::Created(id))
    }

    /// Registers `remote_id` as `parent/<name>`, sanitising the remote name
    ///
    /// # Errors
    /// Same as [`register`](Self::register)
    pub fn register_child(
        &mut self,
        remote_id: RemoteId,
        name: &str,
        sync: bool,
        parent_id: &RemoteId,
    ) -> Result<RegisterOutcome, MappingError> {
        let parent_path = self
            .lookup_by_id(parent_id)
            .map(|p| p.local_path.clone())
            .ok_or_else(|| {
                MappingError::InvalidArgument(format!(
                    "Parent mapping {parent_id} is not registered, must supply a registered parent"
                ))
            })?;
        let local_path = parent_path.join(sanitize_component(name));
        self.register(remote_id, local_path, sync, parent_id)
    }

    /// Removes a mapped folder and its whole subtree from tree and index
    ///
    /// Returns the number of removed nodes.
    ///
    /// # Errors
    /// - `InvalidArgument` if `remote_id` is not registered
    /// - `UnsupportedOperation` when asked to remove the root
    pub fn unregister(&mut self, remote_id: &RemoteId) -> Result<usize, MappingError> {
        let id = self.handle(remote_id).ok_or_else(|| {
            MappingError::InvalidArgument(format!("Mapping {remote_id} is not registered"))
        })?;
        if id == self.root {
            return Err(MappingError::UnsupportedOperation(
                "The root mapping cannot be removed".to_string(),
            ));
        }

        let subtree = self.walk(id);
        if let Some(parent) = self.live(id)?.parent {
            self.live_mut(parent)?.children.retain(|c| *c != id);
        }
        for handle in &subtree {
            if let Some(node) = self.nodes.get_mut(handle.0).and_then(Option::take) {
                self.index.remove(&node.remote_id);
                self.free.push(*handle);
            }
        }

        debug!(remote_id = %remote_id, removed = subtree.len(), "Unmapped folder");
        Ok(subtree.len())
    }

    // ========================================================================
    // Flags
    // ========================================================================

    /// Sets the sync flag of one mapped folder
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `remote_id` is not registered
    pub fn set_sync(&mut self, remote_id: &RemoteId, sync: bool) -> Result<(), MappingError> {
        let id = self.require(remote_id)?;
        self.live_mut(id)?.sync = sync;
        Ok(())
    }

    /// Sets the sync flag of a mapped folder and every mapped descendant
    ///
    /// Returns the number of nodes touched.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if `remote_id` is not registered
    pub fn set_sync_recursive(&mut self, remote_id: &RemoteId, sync: bool) -> Result<usize, MappingError> {
        let id = self.require(remote_id)?;
        let subtree = self.walk(id);
        for handle in &subtree {
            self.live_mut(*handle)?.sync = sync;
        }
        Ok(subtree.len())
    }

    /// Sets the "subtree fully discovered" flag of a node
    pub fn set_subdirs_up_to_date(&mut self, id: NodeId, up_to_date: bool) {
        if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::as_mut) {
            node.subdirs_up_to_date = up_to_date;
        }
    }

    /// Clears `subdirs_up_to_date` on `id` and its ancestors, up to and including `stop`
    ///
    /// When `stop` is not an ancestor the walk continues to the root.
    pub fn invalidate_up_to(&mut self, id: NodeId, stop: NodeId) {
        let mut current = Some(id);
        while let Some(handle) = current {
            let Some(node) = self.nodes.get_mut(handle.0).and_then(Option::as_mut) else {
                break;
            };
            node.subdirs_up_to_date = false;
            if handle == stop {
                break;
            }
            current = node.parent;
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Pre-order handles of `start` and all its descendants
    pub fn walk(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            out.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Pre-order handles of every node with `sync = true`
    pub fn synced_nodes(&self) -> Vec<NodeId> {
        self.walk(self.root)
            .into_iter()
            .filter(|id| self.node(*id).is_some_and(|n| n.sync))
            .collect()
    }

    /// Textual tree, one `name (remoteId)` line per node, tab-indented by depth
    pub fn tree(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.node(id) else { continue };
            let name = if id == self.root {
                node.local_path.display().to_string()
            } else {
                node.name()
            };
            let _ = writeln!(out, "{}{} ({})", "\t".repeat(depth), name, node.remote_id);
            stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
        }
        out
    }

    /// Checks the tree/index mirror and ID uniqueness
    ///
    /// # Errors
    /// Returns `IllegalState` describing the first violation found
    pub fn verify(&self) -> Result<(), MappingError> {
        let reachable = self.walk(self.root);
        if reachable.len() != self.index.len() {
            return Err(MappingError::IllegalState(format!(
                "{} nodes reachable from root but {} indexed",
                reachable.len(),
                self.index.len()
            )));
        }
        for id in reachable {
            let node = self.live(id)?;
            if self.index.get(&node.remote_id) != Some(&id) {
                return Err(MappingError::IllegalState(format!(
                    "Node {} is not indexed under its own handle",
                    node.remote_id
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require(&self, remote_id: &RemoteId) -> Result<NodeId, MappingError> {
        self.handle(remote_id).ok_or_else(|| {
            MappingError::InvalidArgument(format!("Mapping {remote_id} is not registered"))
        })
    }

    fn rebase_descendants(&mut self, id: NodeId, old: &Path, new: &Path) {
        for handle in self.walk(id).into_iter().skip(1) {
            if let Ok(node) = self.live_mut(handle) {
                if let Ok(relative) = node.local_path.strip_prefix(old) {
                    node.local_path = new.join(relative);
                }
            }
        }
    }

    // Handles held by the index or a child list always point at live slots.
    fn live(&self, id: NodeId) -> Result<&DirectoryMappingNode, MappingError> {
        self.node(id).ok_or_else(|| dangling(id))
    }

    fn live_mut(&mut self, id: NodeId) -> Result<&mut DirectoryMappingNode, MappingError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| dangling(id))
    }

    /// Canonical form used for equality: (id, path, sync, parent id, child ids)
    fn canonical(&self) -> BTreeSet<(RemoteId, PathBuf, bool, Option<RemoteId>, BTreeSet<RemoteId>)> {
        self.index
            .values()
            .filter_map(|id| self.node(*id))
            .map(|node| {
                let parent = node
                    .parent
                    .and_then(|p| self.node(p))
                    .map(|p| p.remote_id.clone());
                let children = node
                    .children
                    .iter()
                    .filter_map(|c| self.node(*c))
                    .map(|c| c.remote_id.clone())
                    .collect();
                (node.remote_id.clone(), node.local_path.clone(), node.sync, parent, children)
            })
            .collect()
    }
}

/// Two registries are equal when they map the same IDs to the same paths and
/// sync flags with the same tree shape. Discovery bookkeeping
/// (`subdirs_up_to_date`) and arena layout are not compared.
impl PartialEq for MappingRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.root_node().remote_id == other.root_node().remote_id
            && self.canonical() == other.canonical()
    }
}

impl Eq for MappingRegistry {}

fn dangling(id: NodeId) -> MappingError {
    MappingError::IllegalState(format!("Handle {} points at a removed node", id.0))
}

fn ensure_absolute(path: &Path) -> Result<(), MappingError> {
    if path.is_absolute() {
        Ok(())
    } else {
        Err(MappingError::InvalidPath(format!(
            "Local path must be absolute: {}",
            path.display()
        )))
    }
}
