//! drivemap Remote - Drive REST API adapter
//!
//! Provides an async client for a Drive-v3-style REST API and the
//! [`IRemoteStorage`](drivemap_core::ports::IRemoteStorage) implementation
//! built on it:
//! - Bearer-authenticated requests with HTTP 429 back-off
//! - `files.list` queries with transparent `pageToken` pagination
//! - Metadata, `alt=media` download and two-step upload
//!
//! ## Modules
//!
//! - [`client`] - HTTP client, authentication header and retry loop
//! - [`listing`] - Paginated `files.list` queries
//! - [`provider`] - The remote storage port implementation

pub mod client;
pub mod listing;
pub mod provider;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

pub use client::DriveClient;
pub use provider::DriveRemoteStorage;

/// Errors that can occur when communicating with the Drive API
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Classifies a non-success HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(body),
            StatusCode::FORBIDDEN => Self::Forbidden(body),
            StatusCode::NOT_FOUND => Self::NotFound(body),
            s if s.is_server_error() => Self::ServerError(format!("{s}: {body}")),
            s => Self::InvalidResponse(format!("unexpected status {s}: {body}")),
        }
    }

    /// Returns true if the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
