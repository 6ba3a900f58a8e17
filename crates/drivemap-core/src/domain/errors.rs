//! Domain error types
//!
//! This module defines error types specific to mapping operations:
//! precondition violations, unsupported operations and broken invariants.

use thiserror::Error;

/// Errors that can occur while building or mutating the mapping registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// The caller violated a precondition (unregistered parent, malformed entry)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not supported by the registry's invariants
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An invariant that should be impossible to break was broken
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// A local path was not absolute where one is required
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

impl MappingError {
    /// Returns true for the invalid-argument family (including malformed IDs and paths)
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::InvalidRemoteId(_) | Self::InvalidPath(_)
        )
    }
}
