//! Full crawl: map the whole remote hierarchy from one listing
//!
//! Instead of one request per folder, [`FullCrawl`] fetches every folder of
//! the drive in a single paginated query, buckets them by parent and maps
//! the tree below the registry root in one depth-first pass. Ignored folders
//! are neither mapped nor descended into; new mappings are not synced.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use drivemap_core::domain::{
    sanitize_component, IgnoreMatcher, MappingError, MappingRegistry, RegisterOutcome, RemoteId,
};
use drivemap_core::ports::{IRemoteStorage, RemoteFolder};

use crate::SyncError;

/// Summary of a full crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    /// Folders returned by the listing
    pub listed: usize,
    /// Newly registered folders
    pub mapped: usize,
    /// Known folders visited again
    pub already_mapped: usize,
    /// Folders skipped by ignore rules
    pub ignored: usize,
    /// Folders mapped under another parent
    pub conflicts: usize,
    /// Listed folders not reached from the root (includes folders below ignored ones)
    pub unreachable: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

/// Maps every remote folder below the registry root
pub struct FullCrawl {
    remote: Arc<dyn IRemoteStorage>,
    ignorer: Option<Arc<IgnoreMatcher>>,
}

impl FullCrawl {
    pub fn new(remote: Arc<dyn IRemoteStorage>, ignorer: Option<Arc<IgnoreMatcher>>) -> Self {
        Self { remote, ignorer }
    }

    /// Runs the crawl
    ///
    /// Every folder visited gets `subdirs_up_to_date = true`. Known folders
    /// keep their sync flag.
    ///
    /// # Errors
    /// - `Remote` if the listing fails (nothing is registered then)
    /// - `Mapping` on registry invariant violations
    #[instrument(skip_all)]
    pub async fn run(&self, registry: &mut MappingRegistry) -> Result<CrawlReport, SyncError> {
        let started = Instant::now();
        let folders = self
            .remote
            .list_all_folders()
            .await
            .map_err(SyncError::Remote)?;

        let mut report = CrawlReport {
            listed: folders.len(),
            ..Default::default()
        };

        let mut by_parent: HashMap<&RemoteId, Vec<&RemoteFolder>> = HashMap::new();
        for folder in &folders {
            if let Some(parent) = folder.primary_parent() {
                by_parent.entry(parent).or_default().push(folder);
            }
        }

        let root_id = registry.root_node().remote_id().clone();
        let mut visited: HashSet<RemoteId> = HashSet::new();
        let mut stack = vec![root_id];

        while let Some(parent_id) = stack.pop() {
            if !visited.insert(parent_id.clone()) {
                continue;
            }
            let parent = registry.handle(&parent_id).ok_or_else(|| {
                MappingError::IllegalState(format!("Crawled folder {parent_id} is not mapped"))
            })?;
            let parent_path = registry
                .node(parent)
                .map(|n| n.local_path().to_path_buf())
                .ok_or_else(|| {
                    MappingError::IllegalState(format!("Crawled folder {parent_id} is not live"))
                })?;

            for folder in by_parent.get(&parent_id).into_iter().flatten() {
                let path = parent_path.join(sanitize_component(&folder.name));
                if self.ignorer.as_ref().is_some_and(|i| i.is_ignored(&path)) {
                    debug!(folder = %folder.id, path = %path.display(), "Skipping ignored folder");
                    report.ignored += 1;
                    continue;
                }

                let sync = registry.lookup_by_id(&folder.id).is_some_and(|n| n.sync());
                match registry.register(folder.id.clone(), path, sync, &parent_id) {
                    Ok(RegisterOutcome::Created(_)) => report.mapped += 1,
                    Ok(RegisterOutcome::Updated(_)) => report.already_mapped += 1,
                    Err(MappingError::UnsupportedOperation(reason)) => {
                        warn!(folder = %folder.id, %reason, "Folder is mapped under another parent, skipping");
                        report.conflicts += 1;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
                stack.push(folder.id.clone());
            }
            registry.set_subdirs_up_to_date(parent, true);
        }

        report.unreachable = report.listed.saturating_sub(
            report.mapped + report.already_mapped + report.ignored + report.conflicts,
        );
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            listed = report.listed,
            mapped = report.mapped,
            ignored = report.ignored,
            duration_ms = report.duration_ms,
            "Full crawl finished"
        );
        Ok(report)
    }
}
