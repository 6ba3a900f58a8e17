//! Remote folder discovery
//!
//! The [`DiscoveryEngine`] walks the remote folder hierarchy from a mapped
//! start folder and registers what it finds. It is generic over four policy
//! families, each a small trait with a fixed set of provided variants:
//!
//! | Policy | Trait | Variants |
//! |---|---|---|
//! | Expansion order | [`TraversalStrategy`] | [`DepthFirst`], [`BreadthFirst`], [`DepthTracking`] |
//! | Registration | [`MappingStrategy`] | [`AlwaysMap`], [`MapIfNotAlreadyMapped`] |
//! | Sync flag | [`SyncStrategy`] | [`AlwaysSync`], [`NeverSync`], [`InheritSync`], [`SyncIfNotIgnored`] |
//! | Pruning | [`FilterStrategy`] | [`NoFilter`], [`FilterIfIgnored`], [`DepthLimitFilter`] |

pub mod engine;
pub mod filter;
pub mod mapping;
pub mod sync_policy;
pub mod traversal;

use std::str::FromStr;

pub use engine::{DiscoveryEngine, DiscoveryReport, FolderCallback};
pub use filter::{
    DepthLimitFilter, FilterContext, FilterDecision, FilterIfIgnored, FilterStrategy, NoFilter,
};
pub use mapping::{AlwaysMap, MapIfNotAlreadyMapped, MappingStrategy};
pub use sync_policy::{
    AlwaysSync, InheritSync, NeverSync, NewFolderPolicy, SyncIfNotIgnored, SyncStrategy,
};
pub use traversal::{BreadthFirst, DepthFirst, DepthTracking, TraversalStrategy};

/// The `discovery.traversal` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalOrder {
    #[default]
    DepthFirst,
    BreadthFirst,
}

impl TraversalOrder {
    /// Builds the traversal, wrapped for depth tracking when asked
    pub fn into_strategy(self, track_depth: bool) -> Box<dyn TraversalStrategy> {
        match (self, track_depth) {
            (Self::DepthFirst, false) => Box::new(DepthFirst::new()),
            (Self::BreadthFirst, false) => Box::new(BreadthFirst::new()),
            (Self::DepthFirst, true) => Box::new(DepthTracking::new(DepthFirst::new())),
            (Self::BreadthFirst, true) => Box::new(DepthTracking::new(BreadthFirst::new())),
        }
    }
}

impl FromStr for TraversalOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dfs" => Ok(Self::DepthFirst),
            "bfs" => Ok(Self::BreadthFirst),
            other => Err(format!("unknown traversal '{other}', expected dfs or bfs")),
        }
    }
}
