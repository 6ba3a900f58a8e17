//! Integration tests for drivemap-sync
//!
//! Drives discovery, directory sync, full crawl and ancestor mapping
//! against an in-memory remote and a temporary local tree.

mod common;

mod test_ancestors;
mod test_discovery;
mod test_syncer;
