//! CLI command implementations
//!
//! Every command receives the loaded [`Context`]. Commands that talk to the
//! remote read the access token from `DRIVEMAP_ACCESS_TOKEN`.

pub mod config;
pub mod discover;
pub mod init;
pub mod set_sync;
pub mod status;
pub mod sync;
pub mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};

use drivemap_core::config::Config;
use drivemap_core::domain::{MapFile, MappingRegistry};
use drivemap_core::ports::IRemoteStorage;
use drivemap_remote::{DriveClient, DriveRemoteStorage};

use crate::output::OutputFormat;

/// Environment variable holding the OAuth access token
pub const TOKEN_ENV: &str = "DRIVEMAP_ACCESS_TOKEN";

/// State shared by every command
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    /// Loads the registry from the configured map file
    pub fn load_registry(&self) -> Result<MappingRegistry> {
        let path = &self.config.sync.map_file;
        if !path.is_file() {
            bail!(
                "No map file at {}. Run 'drivemap init' first.",
                path.display()
            );
        }
        MapFile::load(path).with_context(|| format!("Failed to load map file {}", path.display()))
    }

    /// Writes the registry back to the configured map file
    pub fn save_registry(&self, registry: &MappingRegistry) -> Result<()> {
        let path = &self.config.sync.map_file;
        MapFile::persist(registry, path)
            .with_context(|| format!("Failed to write map file {}", path.display()))
    }

    /// Connects to the remote using the token from the environment
    pub fn remote(&self) -> Result<Arc<dyn IRemoteStorage>> {
        let token = access_token()?;
        let client = DriveClient::from_config(token, &self.config.remote)
            .context("Failed to build the HTTP client")?;
        Ok(Arc::new(DriveRemoteStorage::new(client)))
    }
}

fn access_token() -> Result<String> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => bail!("No access token. Set {TOKEN_ENV} to a valid OAuth access token."),
    }
}
