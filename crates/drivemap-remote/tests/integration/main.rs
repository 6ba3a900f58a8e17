//! Integration tests for drivemap-remote
//!
//! Uses wiremock to simulate the Drive API and verifies end-to-end
//! behavior of the client, paginated listings, downloads and uploads.

mod common;

mod test_listing;
mod test_provider;
