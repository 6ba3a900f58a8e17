//! Drive REST API client
//!
//! Provides a typed HTTP client for a Drive-v3-style API. Handles the
//! authentication header, endpoint construction and HTTP 429 back-off.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivemap_remote::client::DriveClient;
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), drivemap_remote::RemoteError> {
//! let client = DriveClient::new("access-token-here");
//! let response = client
//!     .send_with_retry(|| client.request(Method::GET, "/files/root"))
//!     .await?;
//! println!("status {}", response.status());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use drivemap_core::config::RemoteConfig;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::RemoteError;

/// Base URL for the Drive v3 metadata API
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Base URL for the Drive v3 media upload API
const DRIVE_UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Default retry-after duration when header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Longest Retry-After the client will honour
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Default number of items per listing page
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Drive API calls
///
/// Wraps `reqwest::Client` with authentication headers and base URL
/// construction.
#[derive(Debug, Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for metadata requests
    base_url: String,
    /// Base URL for media uploads
    upload_base_url: String,
    /// Current OAuth2 access token
    access_token: String,
    /// Retries allowed for throttled requests
    max_retries: u32,
    /// Items requested per listing page
    page_size: u32,
}

impl DriveClient {
    /// Creates a new DriveClient with the given access token
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: DRIVE_BASE_URL.to_string(),
            upload_base_url: DRIVE_UPLOAD_BASE_URL.to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    ///
    /// Uploads go to `<base_url>/upload`.
    ///
    /// # Arguments
    /// * `access_token` - A valid OAuth2 access token
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            upload_base_url: format!("{base_url}/upload"),
            base_url,
            ..Self::new(access_token)
        }
    }

    /// Creates a client from the `remote` configuration section
    ///
    /// # Errors
    /// Returns `NetworkError` if the HTTP client cannot be built
    pub fn from_config(access_token: impl Into<String>, config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_retries: config.max_retries,
            page_size: config.page_size,
        })
    }

    /// Sets how many times a throttled request is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the listing page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated DriveClient access token");
    }

    /// Returns a reference to the current access token
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Returns the base URL for metadata requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the listing page size
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, PATCH, ...)
    /// * `path` - API path relative to base URL (e.g., "/files")
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Creates an authenticated request builder against the upload base URL
    pub fn upload_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.upload_base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    // ========================================================================
    // 429 response handling
    // ========================================================================

    /// Sends a request, backing off and retrying on HTTP 429
    ///
    /// `build` is called once per attempt because a sent request cannot be
    /// reused. Any other non-success status is classified into a
    /// [`RemoteError`] without retrying.
    ///
    /// # Returns
    /// The successful HTTP response, or an error after all retries are exhausted.
    pub async fn send_with_retry<F>(&self, build: F) -> Result<Response, RemoteError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u32 = 0;
        loop {
            let response = build().send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                if attempt >= self.max_retries {
                    warn!(url = %response.url(), attempts = attempt + 1, "429 retry limit exhausted");
                    return Err(RemoteError::TooManyRequests { retry_after });
                }

                info!(
                    url = %response.url(),
                    attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Received 429, backing off"
                );
                tokio::time::sleep(retry_after).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(RemoteError::from_status(status, body));
            }

            if attempt > 0 {
                info!(url = %response.url(), attempt, "Request succeeded after retry");
            }
            return Ok(response);
        }
    }
}

/// Parses a `Retry-After` header value
///
/// Accepts delay-seconds or an HTTP-date; anything else (or a date more than
/// an hour away) yields `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target <= now {
            return Duration::ZERO;
        }
        if let Ok(wait) = (target - now).to_std() {
            if wait <= MAX_RETRY_AFTER {
                return wait;
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
