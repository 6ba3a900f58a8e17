//! Worklist discovery engine
//!
//! ## Discovery Flow
//!
//! 1. Seed the traversal with the start folder
//! 2. Take the next folder and list its immediate remote child folders
//! 3. For each child: register it if the mapping policy says so (sync flag
//!    from the sync policy), notify the callback, then queue it unless the
//!    filter prunes it
//! 4. Flag the expanded folder `subdirs_up_to_date`. A child pruned by
//!    depth clears the flag on the folder and its ancestors up to the start
//!    folder, so a flagged folder means its whole subtree was fetched
//!
//! With [`with_skip_up_to_date`](DiscoveryEngine::with_skip_up_to_date) a
//! flagged folder is not listed again. Its registered children are queued
//! from the registry instead.
//!
//! A remote failure aborts the pass. Whatever was registered before stays
//! registered, and re-running the pass is idempotent.
//!
//! ## Cancellation
//!
//! The [`CancellationToken`] is checked between folders. On cancellation
//! every folder still on the worklist, and its ancestors up to the start
//! folder, lose `subdirs_up_to_date`, so the registry describes exactly
//! what was covered.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use drivemap_core::config::DiscoveryConfig;
use drivemap_core::domain::{
    IgnoreMatcher, MapFile, MappingError, MappingRegistry, NodeId, RegisterOutcome, RemoteId,
};
use drivemap_core::ports::{IRemoteStorage, RemoteFolder};

use super::filter::{
    DepthLimitFilter, FilterContext, FilterDecision, FilterIfIgnored, FilterStrategy, NoFilter,
};
use super::mapping::{MapIfNotAlreadyMapped, MappingStrategy};
use super::sync_policy::{NewFolderPolicy, SyncStrategy};
use super::traversal::{DepthFirst, DepthTracking, TraversalStrategy};
use super::TraversalOrder;
use crate::SyncError;

/// Called once for every remote child folder seen, after the mapping step
///
/// The folder may or may not be mapped, depending on the mapping policy.
pub type FolderCallback = Box<dyn FnMut(&mut MappingRegistry, &RemoteFolder) + Send>;

// ============================================================================
// DiscoveryReport
// ============================================================================

/// Summary of a discovery pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// Folders whose children were listed
    pub folders_expanded: usize,
    /// Newly registered folders
    pub mapped: usize,
    /// Known folders remapped in place
    pub remapped: usize,
    /// Folders pruned by ignore rules
    pub ignored: usize,
    /// Folders pruned by the depth limit
    pub depth_limited: usize,
    /// Folders skipped because they are mapped under another parent
    pub conflicts: usize,
    /// Folders not listed because their subtree was already fetched
    pub skipped_up_to_date: usize,
    /// Map file checkpoints written during the pass
    pub checkpoints: usize,
    /// Whether the pass stopped on cancellation
    pub cancelled: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Periodic map-file persistence
#[derive(Debug, Clone)]
struct Checkpoint {
    path: PathBuf,
    every: usize,
}

// ============================================================================
// DiscoveryEngine
// ============================================================================

/// Walks the remote hierarchy and registers folders, driven by four policies
///
/// An engine holds traversal-scoped state, so [`run`](Self::run) consumes it.
pub struct DiscoveryEngine {
    remote: Arc<dyn IRemoteStorage>,
    traversal: Box<dyn TraversalStrategy>,
    mapping: Box<dyn MappingStrategy>,
    sync: Box<dyn SyncStrategy>,
    filter: Box<dyn FilterStrategy>,
    callback: Option<FolderCallback>,
    checkpoint: Option<Checkpoint>,
    cancel: CancellationToken,
    skip_up_to_date: bool,
}

impl DiscoveryEngine {
    /// Creates an engine from explicit policies
    pub fn new(
        remote: Arc<dyn IRemoteStorage>,
        traversal: Box<dyn TraversalStrategy>,
        mapping: Box<dyn MappingStrategy>,
        sync: Box<dyn SyncStrategy>,
        filter: Box<dyn FilterStrategy>,
    ) -> Self {
        Self {
            remote,
            traversal,
            mapping,
            sync,
            filter,
            callback: None,
            checkpoint: None,
            cancel: CancellationToken::new(),
            skip_up_to_date: false,
        }
    }

    /// Unbounded depth-first discovery of folders not mapped yet
    ///
    /// Ignored folders are not expanded when `ignorer` is given; pass
    /// `None` to traverse through ignore rules.
    pub fn naive(
        remote: Arc<dyn IRemoteStorage>,
        sync: Box<dyn SyncStrategy>,
        ignorer: Option<Arc<IgnoreMatcher>>,
    ) -> Self {
        Self::new(
            remote,
            Box::new(DepthFirst::new()),
            Box::new(MapIfNotAlreadyMapped),
            sync,
            ignore_filter(ignorer),
        )
    }

    /// Depth-first discovery of folders not mapped yet, at most `max_depth`
    /// levels below the start folder
    ///
    /// `then` is consulted for folders within the depth limit.
    pub fn depth_limited(
        remote: Arc<dyn IRemoteStorage>,
        sync: Box<dyn SyncStrategy>,
        then: Box<dyn FilterStrategy>,
        max_depth: usize,
    ) -> Self {
        Self::new(
            remote,
            Box::new(DepthTracking::new(DepthFirst::new())),
            Box::new(MapIfNotAlreadyMapped),
            sync,
            Box::new(DepthLimitFilter::new(max_depth, then)),
        )
    }

    /// Builds an engine from the `discovery` configuration section
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an unknown traversal or new-folder policy
    pub fn from_config(
        remote: Arc<dyn IRemoteStorage>,
        config: &DiscoveryConfig,
        ignorer: Option<Arc<IgnoreMatcher>>,
    ) -> Result<Self, SyncError> {
        let order: TraversalOrder = config
            .traversal
            .parse()
            .map_err(MappingError::InvalidArgument)?;
        let policy: NewFolderPolicy = config
            .new_folders
            .parse()
            .map_err(MappingError::InvalidArgument)?;

        let sync = policy.into_strategy(ignorer.clone());
        let second = ignore_filter(ignorer);
        let traversal = order.into_strategy(config.max_depth.is_some());
        let filter: Box<dyn FilterStrategy> = match config.max_depth {
            Some(max_depth) => Box::new(DepthLimitFilter::new(max_depth, second)),
            None => second,
        };

        Ok(Self::new(
            remote,
            traversal,
            Box::new(MapIfNotAlreadyMapped),
            sync,
            filter,
        ))
    }

    /// Replaces the mapping policy
    pub fn with_mapping(mut self, mapping: Box<dyn MappingStrategy>) -> Self {
        self.mapping = mapping;
        self
    }

    /// Sets the per-folder callback
    pub fn with_callback(mut self, callback: FolderCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Persists the registry to `path` every `every` expanded folders (0 disables)
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>, every: usize) -> Self {
        self.checkpoint = (every > 0).then(|| Checkpoint {
            path: path.into(),
            every,
        });
        self
    }

    /// Sets the token observed between folders
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Trusts `subdirs_up_to_date` and does not list flagged folders again
    pub fn with_skip_up_to_date(mut self, skip: bool) -> Self {
        self.skip_up_to_date = skip;
        self
    }

    /// Runs discovery from the mapped folder `start`
    ///
    /// # Errors
    /// - `Mapping(InvalidArgument)` if `start` is not mapped
    /// - `Remote` if listing a folder fails; the pass stops there
    /// - `MapFile` if a checkpoint cannot be written
    #[instrument(skip_all, fields(start = %start))]
    pub async fn run(
        mut self,
        registry: &mut MappingRegistry,
        start: &RemoteId,
    ) -> Result<DiscoveryReport, SyncError> {
        let started = Instant::now();
        let start_node = registry.handle(start).ok_or_else(|| {
            MappingError::InvalidArgument(format!(
                "The start mapping {start} is not registered, must supply a registered mapping"
            ))
        })?;

        info!(mapped = registry.len(), "Discovery started");

        let mut report = DiscoveryReport::default();
        let mut expanded: HashSet<NodeId> = HashSet::new();
        self.traversal.start(start_node);

        while !self.traversal.is_done() {
            if self.cancel.is_cancelled() {
                let pending = self.traversal.drain();
                info!(pending = pending.len(), "Discovery cancelled");
                for node in pending {
                    registry.invalidate_up_to(node, start_node);
                }
                report.cancelled = true;
                break;
            }

            let current = self.traversal.next_node()?;
            if !expanded.insert(current) {
                continue;
            }

            let node = live(registry, current)?;
            let current_id = node.remote_id().clone();
            if self.skip_up_to_date && node.subdirs_up_to_date() {
                debug!(folder = %current_id, "Subtree already fetched, not listing");
                self.queue_known(registry, current, &expanded)?;
                report.skipped_up_to_date += 1;
                continue;
            }

            let children = match self.remote.list_child_folders(&current_id).await {
                Ok(children) => children,
                Err(e) => {
                    registry.invalidate_up_to(current, start_node);
                    for node in self.traversal.drain() {
                        registry.invalidate_up_to(node, start_node);
                    }
                    warn!(folder = %current_id, error = %format!("{e:#}"), "Discovery aborted");
                    return Err(SyncError::Remote(e));
                }
            };

            let limited = self.expand(registry, current, &current_id, &children, &expanded, &mut report)?;
            if limited {
                registry.invalidate_up_to(current, start_node);
            } else {
                // cleared again if a descendant gets pruned later in the pass
                registry.set_subdirs_up_to_date(current, true);
            }
            report.folders_expanded += 1;

            if let Some(checkpoint) = &self.checkpoint {
                if report.folders_expanded % checkpoint.every == 0 {
                    MapFile::persist(registry, &checkpoint.path)?;
                    report.checkpoints += 1;
                    debug!(path = %checkpoint.path.display(), "Discovery checkpoint written");
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            expanded = report.folders_expanded,
            mapped = report.mapped,
            remapped = report.remapped,
            ignored = report.ignored,
            depth_limited = report.depth_limited,
            skipped = report.skipped_up_to_date,
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "Discovery finished"
        );
        Ok(report)
    }

    /// Queues the registered children of an already fetched folder
    fn queue_known(
        &mut self,
        registry: &MappingRegistry,
        current: NodeId,
        expanded: &HashSet<NodeId>,
    ) -> Result<(), SyncError> {
        let depth = self.traversal.depth_of(current).map(|d| d + 1);
        for &child in live(registry, current)?.children() {
            if expanded.contains(&child) {
                continue;
            }
            let ctx = FilterContext {
                registry,
                node: child,
                parent: current,
                depth,
            };
            if self.filter.filter(&ctx)? == FilterDecision::Expand {
                self.traversal.add_child(child, current)?;
            }
        }
        Ok(())
    }

    /// Maps and queues the children of one folder
    ///
    /// Returns true if any child was pruned by depth.
    fn expand(
        &mut self,
        registry: &mut MappingRegistry,
        current: NodeId,
        current_id: &RemoteId,
        children: &[RemoteFolder],
        expanded: &HashSet<NodeId>,
        report: &mut DiscoveryReport,
    ) -> Result<bool, SyncError> {
        let mut limited = false;

        for folder in children {
            if self.mapping.should_map(&folder.id, registry) {
                let sync = self.sync.should_sync(folder, live(registry, current)?);
                match registry.register_child(folder.id.clone(), &folder.name, sync, current_id) {
                    Ok(RegisterOutcome::Created(_)) => report.mapped += 1,
                    Ok(RegisterOutcome::Updated(_)) => report.remapped += 1,
                    Err(MappingError::UnsupportedOperation(reason)) => {
                        warn!(folder = %folder.id, %reason, "Folder is mapped under another parent, skipping");
                        report.conflicts += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            if let Some(callback) = self.callback.as_mut() {
                callback(registry, folder);
            }

            let Some(node) = registry.handle(&folder.id) else {
                continue;
            };
            if live(registry, node)?.parent() != Some(current) {
                debug!(folder = %folder.id, "Not expanding folder mapped elsewhere");
                continue;
            }

            let ctx = FilterContext {
                registry: &*registry,
                node,
                parent: current,
                depth: self.traversal.depth_of(current).map(|d| d + 1),
            };
            match self.filter.filter(&ctx)? {
                FilterDecision::Expand => {
                    if !expanded.contains(&node) {
                        self.traversal.add_child(node, current)?;
                    }
                }
                FilterDecision::Ignored => {
                    debug!(folder = %folder.id, name = %folder.name, "Pruned ignored folder");
                    report.ignored += 1;
                }
                FilterDecision::DepthLimited => {
                    debug!(folder = %folder.id, name = %folder.name, "Pruned folder at depth limit");
                    report.depth_limited += 1;
                    limited = true;
                }
            }
        }

        Ok(limited)
    }
}

fn ignore_filter(ignorer: Option<Arc<IgnoreMatcher>>) -> Box<dyn FilterStrategy> {
    match ignorer {
        Some(ignorer) => Box::new(FilterIfIgnored::new(ignorer)),
        None => Box::new(NoFilter),
    }
}

fn live(
    registry: &MappingRegistry,
    id: NodeId,
) -> Result<&drivemap_core::domain::DirectoryMappingNode, MappingError> {
    registry.node(id).ok_or_else(|| {
        MappingError::IllegalState(format!("Queued node {} is no longer mapped", id.index()))
    })
}
