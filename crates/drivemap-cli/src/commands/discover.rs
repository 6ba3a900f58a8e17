//! Discover command - Register remote folders below a mapped folder
//!
//! Runs the discovery engine with the policies from the `discovery` config
//! section, overridden by the flags below, or a single-listing full crawl
//! with `--crawl`. The map file is written when the pass ends, including a
//! pass stopped by Ctrl-C.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use drivemap_core::domain::{IgnoreMatcher, RemoteId};
use drivemap_sync::{AncestorMapper, DiscoveryEngine, FullCrawl};

use super::Context;
use crate::output::{format_duration, get_formatter, plural};

#[derive(Debug, Args)]
pub struct DiscoverCommand {
    /// Folder to start from (defaults to the mapping root)
    #[arg(long)]
    pub from: Option<RemoteId>,

    /// Stop this many levels below the start folder
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Expand breadth-first instead of depth-first
    #[arg(long)]
    pub bfs: bool,

    /// Sync flag of new folders: always, never, inherit or unless_ignored
    #[arg(long)]
    pub new_folders: Option<String>,

    /// Descend into ignored folders too
    #[arg(long)]
    pub no_ignore: bool,

    /// Map the whole drive from one folder listing
    #[arg(long, conflicts_with_all = ["from", "max_depth", "bfs"])]
    pub crawl: bool,
}

impl DiscoverCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let mut registry = ctx.load_registry()?;
        let remote = ctx.remote()?;
        let ignorer = self.ignorer(ctx)?;

        if self.crawl {
            let report = FullCrawl::new(remote, ignorer).run(&mut registry).await?;
            ctx.save_registry(&registry)?;

            if ctx.format.is_json() {
                formatter.print_json(&serde_json::to_value(&report)?);
            } else {
                formatter.success(&format!(
                    "Crawled {} in {}",
                    plural(report.listed, "folder"),
                    format_duration(report.duration_ms)
                ));
                formatter.info(&format!("New mappings:   {}", report.mapped));
                formatter.info(&format!("Already mapped: {}", report.already_mapped));
                formatter.info(&format!("Ignored:        {}", report.ignored));
                if report.unreachable > 0 {
                    formatter.info(&format!("Not below root: {}", report.unreachable));
                }
            }
            return Ok(());
        }

        let start = match &self.from {
            Some(id) => {
                if !registry.is_mapped(id) {
                    info!(folder = %id, "Start folder not mapped yet, mapping its ancestors");
                    AncestorMapper::new(Arc::clone(&remote))
                        .map_with_ancestors(&mut registry, id)
                        .await?;
                }
                id.clone()
            }
            None => registry.root_node().remote_id().clone(),
        };

        let mut discovery = ctx.config.discovery.clone();
        if self.max_depth.is_some() {
            discovery.max_depth = self.max_depth;
        }
        if self.bfs {
            discovery.traversal = "bfs".to_string();
        }
        if let Some(policy) = &self.new_folders {
            discovery.new_folders = policy.clone();
        }

        let cancel = CancellationToken::new();
        spawn_ctrl_c(cancel.clone());

        let engine = DiscoveryEngine::from_config(remote, &discovery, ignorer)?
            .with_checkpoint(&ctx.config.sync.map_file, discovery.checkpoint_every)
            .with_cancellation(cancel);
        let result = engine.run(&mut registry, &start).await;

        // Whatever was registered before a failure is kept.
        ctx.save_registry(&registry)?;
        let report = result?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
            return Ok(());
        }

        if report.cancelled {
            formatter.warn("Discovery interrupted; run it again to continue");
        } else {
            formatter.success(&format!(
                "Discovered {} in {}",
                plural(report.folders_expanded, "folder"),
                format_duration(report.duration_ms)
            ));
        }
        formatter.info(&format!("New mappings:  {}", report.mapped));
        if report.remapped > 0 {
            formatter.info(&format!("Remapped:      {}", report.remapped));
        }
        formatter.info(&format!("Ignored:       {}", report.ignored));
        if report.depth_limited > 0 {
            formatter.info(&format!("Depth limited: {}", report.depth_limited));
        }
        if report.conflicts > 0 {
            formatter.warn(&format!(
                "{} already mapped under another parent",
                plural(report.conflicts, "folder")
            ));
        }
        Ok(())
    }

    fn ignorer(&self, ctx: &Context) -> Result<Option<Arc<IgnoreMatcher>>> {
        if self.no_ignore {
            return Ok(None);
        }
        match ctx.config.ignore_matcher() {
            Ok(matcher) => Ok(Some(matcher)),
            Err(e) => bail!("Invalid ignore rules: {e}"),
        }
    }
}

/// Cancels `token` on the first Ctrl-C
pub(crate) fn spawn_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, finishing the current folder");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}
