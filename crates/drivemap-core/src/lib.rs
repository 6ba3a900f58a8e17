//! drivemap Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `DirectoryMappingNode`, `MappingRegistry`, `IgnoreMatcher`
//! - **Persistence** - the JSON map file that records the registry between runs
//! - **Port definitions** - Traits for adapters: `IRemoteStorage`, `ILocalFileSystem`
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module holds the mapping data structure and its invariants.
//! Ports define trait interfaces that adapter crates implement; the discovery
//! engine and the directory syncer in `drivemap-sync` drive them.

pub mod config;
pub mod domain;
pub mod ports;
