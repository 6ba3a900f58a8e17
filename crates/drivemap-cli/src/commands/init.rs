//! Init command - Configure the mapping root
//!
//! Bootstraps a one-node registry mapping a remote folder onto a local
//! directory, writes it to the map file and records both roots in the
//! configuration file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::Args;
use tracing::{info, warn};

use drivemap_core::domain::{MapFile, MappingRegistry, RemoteId};

use super::Context;
use crate::output::get_formatter;

/// Alias the remote API accepts for the drive's top folder
const ROOT_ALIAS: &str = "root";

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Remote folder ID to map (defaults to `sync.remote_root`, then `root`)
    #[arg(long)]
    pub remote_root: Option<String>,

    /// Local directory to map it onto (defaults to `sync.local_root`)
    #[arg(long)]
    pub local_root: Option<PathBuf>,

    /// Replace an existing map file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let map_file = &ctx.config.sync.map_file;

        if MapFile::is_configured(map_file) && !self.force {
            bail!(
                "A mapping is already configured in {}. Pass --force to replace it.",
                map_file.display()
            );
        }

        let local_root = absolutize(
            self.local_root
                .as_deref()
                .unwrap_or(&ctx.config.sync.local_root),
        )?;
        let requested = self
            .remote_root
            .clone()
            .or_else(|| ctx.config.sync.remote_root.clone())
            .unwrap_or_else(|| ROOT_ALIAS.to_string());
        let remote_root = resolve_root(ctx, &requested).await?;

        let registry = MappingRegistry::bootstrap(remote_root.clone(), local_root.clone())?;
        ctx.save_registry(&registry)?;

        let mut config = ctx.config.clone();
        config.sync.remote_root = Some(remote_root.as_str().to_string());
        config.sync.local_root = local_root.clone();
        config
            .save(&ctx.config_path)
            .with_context(|| format!("Failed to write {}", ctx.config_path.display()))?;

        info!(remote_root = %remote_root, local_root = %local_root.display(), "Mapping root configured");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "remote_root": remote_root.as_str(),
                "local_root": local_root.display().to_string(),
                "map_file": map_file.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Mapped {} onto {}", remote_root, local_root.display()));
            formatter.info(&format!("Map file: {}", map_file.display()));
            formatter.info("Next: 'drivemap discover' then 'drivemap sync'");
        }
        Ok(())
    }
}

/// Turns the `root` alias into the drive's real folder ID
///
/// Map files must hold real IDs, otherwise the root would never match the
/// parent IDs the remote reports. Without a token the alias cannot be
/// resolved and is rejected.
async fn resolve_root(ctx: &Context, requested: &str) -> Result<RemoteId> {
    if requested != ROOT_ALIAS {
        return Ok(requested.parse::<RemoteId>()?);
    }
    let remote = ctx
        .remote()
        .context("Resolving the 'root' alias needs remote access; pass --remote-root <ID> instead")?;
    let item = remote.get_metadata(&requested.parse::<RemoteId>()?).await?;
    if !item.is_folder() {
        warn!(id = %item.id, "Remote root is not a folder");
        bail!("Remote root {} is not a folder", item.id);
    }
    Ok(item.id)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("Failed to read the current directory")?
        .join(path))
}
