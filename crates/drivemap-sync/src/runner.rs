//! Whole-tree synchronization
//!
//! Runs the [`DirectorySyncer`] over every mapped folder flagged
//! `sync = true`, in pre-order, so a parent's directory exists before its
//! children are synced. Folders registered during the pass are picked up
//! in the same pass.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use drivemap_core::domain::{MappingRegistry, NodeId};

use crate::syncer::{DirectorySyncer, SyncReport};
use crate::SyncError;

/// Summary of a whole-tree sync
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    /// Directories synced
    pub directories: usize,
    /// Counters accumulated over every directory
    pub totals: SyncReport,
    /// Whether the pass stopped on cancellation
    pub cancelled: bool,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Syncs every folder flagged `sync = true`
///
/// The token is checked between directories. The first failure aborts the
/// pass; directories synced before it keep their local state.
#[instrument(skip_all)]
pub async fn sync_all(
    syncer: &DirectorySyncer,
    registry: &mut MappingRegistry,
    cancel: &CancellationToken,
) -> Result<SyncSummary, SyncError> {
    let started = Instant::now();
    let mut summary = SyncSummary::default();
    let mut pending: VecDeque<NodeId> = registry.synced_nodes().into();
    let mut done: HashSet<NodeId> = HashSet::new();

    info!(synced = pending.len(), "Sync started");

    while let Some(id) = pending.pop_front() {
        if cancel.is_cancelled() {
            info!(remaining = pending.len() + 1, "Sync cancelled");
            summary.cancelled = true;
            break;
        }
        if !done.insert(id) {
            continue;
        }
        let Some(node) = registry.node(id) else { continue };
        if !node.sync() {
            continue;
        }
        let remote_id = node.remote_id().clone();

        let report = syncer.sync_directory(registry, &remote_id).await?;
        summary.totals.absorb(&report);
        summary.directories += 1;

        if let Some(node) = registry.node(id) {
            pending.extend(
                node.children()
                    .iter()
                    .filter(|c| !done.contains(c))
                    .copied(),
            );
        }
    }

    summary.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        directories = summary.directories,
        downloaded = summary.totals.files_downloaded,
        cancelled = summary.cancelled,
        duration_ms = summary.duration_ms,
        "Sync finished"
    );
    Ok(summary)
}
