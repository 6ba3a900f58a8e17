//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::MappingError;

// ============================================================================
// Remote identifiers
// ============================================================================

/// Opaque remote folder/file identifier
///
/// Remote storage identifies items by stable IDs, never by path. Format:
/// URL-safe string, typically like "1AbC_dEfGhIjK-LmNoPqRsTuVwXyZ012". The
/// alias "root" is accepted and refers to the drive root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains whitespace or path separators
    pub fn new(id: String) -> Result<Self, MappingError> {
        if id.is_empty() {
            return Err(MappingError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if id.chars().any(|c| c.is_whitespace() || c == '/' || c == '\\') {
            return Err(MappingError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = MappingError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// Remote names
// ============================================================================

/// Turn a remote item name into a single local path component
///
/// Remote names may contain characters that are path separators locally.
/// `/` and NUL become `_`; an empty name, `.` and `..` become `_`.
#[must_use]
pub fn sanitize_component(name: &str) -> String {
    match name {
        "" | "." | ".." => "_".to_string(),
        _ => name
            .chars()
            .map(|c| if c == '/' || c == '\0' { '_' } else { c })
            .collect(),
    }
}
