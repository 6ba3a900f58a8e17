//! Sync command - Pull every synced folder to disk
//!
//! Provides the `drivemap sync` CLI command which:
//! 1. Loads the registry from the map file
//! 2. Creates the remote and local filesystem adapters
//! 3. Runs the directory syncer over every folder flagged for sync
//! 4. Writes back mappings created along the way

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use drivemap_core::domain::RemoteId;
use drivemap_sync::{sync_all, DirectorySyncer, LocalFileSystemAdapter};

use super::discover::spawn_ctrl_c;
use super::Context;
use crate::output::{format_duration, get_formatter, plural};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Sync only this folder instead of the whole tree
    #[arg(long)]
    pub folder: Option<RemoteId>,
}

impl SyncCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let mut registry = ctx.load_registry()?;
        let remote = ctx.remote()?;
        let syncer = DirectorySyncer::new(remote, Arc::new(LocalFileSystemAdapter::new()))
            .with_map_file(&ctx.config.sync.map_file);

        if let Some(folder) = &self.folder {
            let report = syncer.sync_directory(&mut registry, folder).await?;
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::to_value(&report)?);
            } else {
                formatter.success(&format!("Synced {folder}"));
                formatter.info(&format!("Downloaded: {}", plural(report.files_downloaded, "file")));
                formatter.info(&format!("Up to date: {}", plural(report.files_up_to_date, "file")));
            }
            return Ok(());
        }

        let cancel = CancellationToken::new();
        spawn_ctrl_c(cancel.clone());

        info!(map_file = %ctx.config.sync.map_file.display(), "Starting synchronization");
        let summary = sync_all(&syncer, &mut registry, &cancel).await?;
        ctx.save_registry(&registry)?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&summary)?);
            return Ok(());
        }

        let totals = &summary.totals;
        if summary.cancelled {
            formatter.warn("Sync interrupted; run it again to continue");
        } else if totals.files_downloaded + totals.shortcuts_written + totals.directories_created == 0 {
            formatter.success("Already up to date");
        } else {
            formatter.success(&format!(
                "Synced {} in {}",
                plural(summary.directories, "folder"),
                format_duration(summary.duration_ms)
            ));
        }
        if totals.directories_created > 0 {
            formatter.info(&format!("Created:    {}", plural(totals.directories_created, "folder")));
        }
        if totals.files_downloaded > 0 {
            formatter.info(&format!("Downloaded: {}", plural(totals.files_downloaded, "file")));
        }
        if totals.shortcuts_written > 0 {
            formatter.info(&format!("Shortcuts:  {}", plural(totals.shortcuts_written, "document")));
        }
        if totals.unsynced_skipped > 0 {
            formatter.info(&format!("Not synced: {}", plural(totals.unsynced_skipped, "folder")));
        }
        Ok(())
    }
}
