//! Set-sync command - Turn syncing of a folder on or off
//!
//! A folder that discovery has not reached yet is mapped first, together
//! with the chain of folders between it and the nearest mapped ancestor.

use anyhow::Result;
use clap::Args;
use tracing::info;

use drivemap_core::domain::RemoteId;
use drivemap_sync::AncestorMapper;

use super::Context;
use crate::output::get_formatter;

#[derive(Debug, Args)]
#[command(group = clap::ArgGroup::new("flag").required(true).args(["on", "off"]))]
pub struct SetSyncCommand {
    /// Remote folder ID
    pub id: RemoteId,

    /// Sync the folder
    #[arg(long)]
    pub on: bool,

    /// Stop syncing the folder
    #[arg(long)]
    pub off: bool,

    /// Apply to every mapped subfolder as well
    #[arg(long, short)]
    pub recursive: bool,
}

impl SetSyncCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let mut registry = ctx.load_registry()?;
        let sync = self.on;

        let mut newly_mapped = false;
        if !registry.is_mapped(&self.id) {
            info!(folder = %self.id, "Folder not mapped yet, mapping its ancestors");
            AncestorMapper::new(ctx.remote()?)
                .map_with_ancestors(&mut registry, &self.id)
                .await?;
            newly_mapped = true;
        }

        let touched = if self.recursive {
            registry.set_sync_recursive(&self.id, sync)?
        } else {
            registry.set_sync(&self.id, sync)?;
            1
        };
        ctx.save_registry(&registry)?;

        let path = registry
            .lookup_by_id(&self.id)
            .map(|node| node.local_path().display().to_string())
            .unwrap_or_default();

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "id": self.id.as_str(),
                "sync": sync,
                "local_path": path,
                "folders": touched,
                "newly_mapped": newly_mapped,
            }));
        } else {
            let state = if sync { "on" } else { "off" };
            formatter.success(&format!("Sync {state} for {path}"));
            if touched > 1 {
                formatter.info(&format!("Applied to {touched} folders"));
            }
        }
        Ok(())
    }
}
