//! Status command - Report whether a mapping is configured
//!
//! "Configured" means the map file exists and parses into a registry.

use anyhow::Result;
use clap::Args;
use tracing::info;

use drivemap_core::domain::MapFile;

use super::Context;
use crate::output::get_formatter;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let map_file = &ctx.config.sync.map_file;

        info!(map_file = %map_file.display(), "Checking mapping status");

        if !MapFile::is_configured(map_file) {
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "configured": false,
                    "map_file": map_file.display().to_string(),
                }));
            } else {
                formatter.warn("Not configured");
                formatter.info(&format!("No valid map file at {}", map_file.display()));
                formatter.info("Run 'drivemap init --remote-root <ID> --local-root <PATH>'");
            }
            return Ok(());
        }

        let registry = ctx.load_registry()?;
        let root = registry.root_node();
        let synced = registry.synced_nodes().len();

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "configured": true,
                "map_file": map_file.display().to_string(),
                "remote_root": root.remote_id().as_str(),
                "local_root": root.local_path().display().to_string(),
                "mappings": registry.len(),
                "synced": synced,
            }));
            return Ok(());
        }

        formatter.success("Configured");
        formatter.info(&format!("Map file:    {}", map_file.display()));
        formatter.info(&format!("Remote root: {}", root.remote_id()));
        formatter.info(&format!("Local root:  {}", root.local_path().display()));
        formatter.info(&format!("Mappings:    {}", registry.len()));
        formatter.info(&format!("Synced:      {}", synced));
        Ok(())
    }
}
