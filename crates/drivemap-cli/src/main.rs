//! drivemap CLI - Command-line interface for drivemap
//!
//! Provides commands for:
//! - Checking whether a mapping is configured
//! - Bootstrapping the mapping root
//! - Discovering remote folders
//! - Pulling synced folders to disk
//! - Inspecting and editing the mapping tree

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use drivemap_core::config::Config;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, discover::DiscoverCommand, init::InitCommand,
    set_sync::SetSyncCommand, status::StatusCommand, sync::SyncCommand, tree::TreeCommand,
    Context,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "drivemap", version, about = "Map a remote drive onto a local directory")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show whether a mapping is configured
    Status(StatusCommand),
    /// Map a remote folder onto a local directory
    Init(InitCommand),
    /// Discover remote folders and register them
    Discover(DiscoverCommand),
    /// Pull every synced folder to disk
    Sync(SyncCommand),
    /// Print the mapping tree
    Tree(TreeCommand),
    /// Turn syncing of a folder on or off
    SetSync(SetSyncCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    // Setup tracing
    let filter = match cli.verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = Context {
        config,
        config_path,
        format,
    };

    match cli.command {
        Commands::Status(cmd) => cmd.execute(&ctx).await,
        Commands::Init(cmd) => cmd.execute(&ctx).await,
        Commands::Discover(cmd) => cmd.execute(&ctx).await,
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Tree(cmd) => cmd.execute(&ctx).await,
        Commands::SetSync(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}
