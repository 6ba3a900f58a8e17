//! Domain entities and business logic
//!
//! This module contains the core domain types for drivemap:
//! - Newtypes for remote identifiers and remote names
//! - The directory mapping tree and its flattened registry
//! - The persisted map file format
//! - Ignore rules
//! - Domain-specific error types

pub mod errors;
pub mod ignore;
pub mod map_file;
pub mod mapping;
pub mod newtypes;

// Re-export commonly used types
pub use errors::MappingError;
pub use ignore::{IgnoreError, IgnoreMatcher};
pub use map_file::{MapFile, MapFileError};
pub use mapping::{DirectoryMappingNode, MappingRegistry, NodeId, RegisterOutcome};
pub use newtypes::{sanitize_component, RemoteId};
