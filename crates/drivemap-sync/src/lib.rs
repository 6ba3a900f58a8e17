//! drivemap Sync - Discovery and directory synchronization
//!
//! Provides:
//! - Remote folder discovery driven by four pluggable policies
//! - One-directory pull synchronization and the whole-tree runner
//! - Single-query full crawl and ancestor mapping
//! - The local filesystem adapter
//!
//! ## Modules
//!
//! - [`discovery`] - Worklist discovery engine and its policy families
//! - [`syncer`] - Pull one mapped directory from the remote
//! - [`runner`] - Sync every directory flagged `sync = true`
//! - [`crawl`] - Map the whole remote hierarchy from one listing
//! - [`ancestors`] - Map a folder together with its missing ancestors
//! - [`native_docs`] - Shortcut files for non-downloadable documents
//! - [`filesystem`] - Local filesystem adapter (atomic writes, mtimes)

pub mod ancestors;
pub mod crawl;
pub mod discovery;
pub mod filesystem;
pub mod native_docs;
pub mod runner;
pub mod syncer;

use drivemap_core::domain::{MapFileError, MappingError};
use thiserror::Error;

pub use ancestors::AncestorMapper;
pub use crawl::{CrawlReport, FullCrawl};
pub use discovery::{DiscoveryEngine, DiscoveryReport};
pub use filesystem::LocalFileSystemAdapter;
pub use runner::{sync_all, SyncSummary};
pub use syncer::{DirectorySyncer, SyncReport};

/// Errors that can abort a discovery or synchronization pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// A mapping invariant or precondition was violated
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// The map file could not be written or read
    #[error("Map file error: {0}")]
    MapFile(#[from] MapFileError),

    /// Talking to the remote storage failed
    #[error("Remote I/O failure: {0:#}")]
    Remote(anyhow::Error),

    /// A local filesystem operation failed
    #[error("Local I/O failure: {0:#}")]
    Io(anyhow::Error),
}

impl SyncError {
    /// Returns true for precondition violations the caller should fix
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::Mapping(e) if e.is_invalid_argument())
    }

    /// Returns true for failures of the remote collaborator
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}
