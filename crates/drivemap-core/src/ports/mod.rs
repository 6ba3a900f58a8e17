//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStorage`] - Remote folder listing, metadata, download and upload
//! - [`ILocalFileSystem`] - Local directory creation, atomic writes and stat

pub mod local_filesystem;
pub mod remote_storage;

pub use local_filesystem::{FileSystemState, ILocalFileSystem};
pub use remote_storage::{IRemoteStorage, RemoteFolder, RemoteItem, FOLDER_MIME_TYPE};
