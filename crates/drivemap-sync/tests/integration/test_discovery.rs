//! Discovery engine tests against the in-memory remote

use std::path::{Path, PathBuf};
use std::sync::Arc;

use drivemap_core::config::DiscoveryConfig;
use drivemap_core::domain::{IgnoreMatcher, MapFile, MappingRegistry};
use drivemap_core::ports::RemoteFolder;
use drivemap_sync::discovery::{
    AlwaysMap, AlwaysSync, DepthFirst, DiscoveryEngine, InheritSync, NeverSync, NoFilter,
};
use drivemap_sync::SyncError;
use tokio_util::sync::CancellationToken;

use crate::common::{registry_at, rid, FakeRemote};

/// R
/// ├── docs (A)
/// │   ├── 2024 (B)
/// │   └── .git (G)
/// │       └── objects (O)
/// └── music (C)
fn sample_remote() -> Arc<FakeRemote> {
    let remote = FakeRemote::new();
    remote.add_folder("A", "docs", "R");
    remote.add_folder("B", "2024", "A");
    remote.add_folder("G", ".git", "A");
    remote.add_folder("O", "objects", "G");
    remote.add_folder("C", "music", "R");
    remote
}

fn path_of(registry: &MappingRegistry, id: &str) -> Option<PathBuf> {
    registry.lookup_by_id(&rid(id)).map(|n| n.local_path().to_path_buf())
}

#[tokio::test]
async fn test_depth_zero_maps_children_without_expanding() {
    let remote = FakeRemote::new();
    remote.add_folder("F", "folder", "R");
    remote.add_folder("FF", "inner", "F");
    let mut registry = registry_at(Path::new("/sync"));

    let report = DiscoveryEngine::depth_limited(remote.clone(), Box::new(AlwaysSync), Box::new(NoFilter), 0)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert!(registry.is_mapped(&rid("F")));
    assert_eq!(registry.parent_of(&rid("F")).unwrap().remote_id(), &rid("R"));
    assert!(!registry.is_mapped(&rid("FF")));
    assert!(!registry.root_node().subdirs_up_to_date());
    assert_eq!(remote.listings(), vec![rid("R")]);
    assert_eq!(report.depth_limited, 1);
}

#[tokio::test]
async fn test_naive_discovery_maps_whole_tree() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));

    let report = DiscoveryEngine::naive(remote.clone(), Box::new(NeverSync), None)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(report.mapped, 5);
    assert_eq!(report.folders_expanded, 6);
    assert_eq!(path_of(&registry, "B"), Some(PathBuf::from("/sync/docs/2024")));
    assert_eq!(path_of(&registry, "O"), Some(PathBuf::from("/sync/docs/.git/objects")));
    assert!(!registry.lookup_by_id(&rid("A")).unwrap().sync());
    assert!(registry.lookup_by_id(&rid("A")).unwrap().subdirs_up_to_date());
    registry.verify().unwrap();
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));

    DiscoveryEngine::naive(remote.clone(), Box::new(InheritSync), None)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();
    let once = registry.clone();

    let second = DiscoveryEngine::naive(remote.clone(), Box::new(InheritSync), None)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(second.mapped, 0);
    assert_eq!(registry, once);

    // remapping everything in place changes nothing either
    DiscoveryEngine::new(
        remote.clone(),
        Box::new(DepthFirst::new()),
        Box::new(AlwaysMap),
        Box::new(InheritSync),
        Box::new(NoFilter),
    )
    .run(&mut registry, &rid("R"))
    .await
    .unwrap();
    assert_eq!(registry, once);
}

#[tokio::test]
async fn test_ignored_folders_are_mapped_but_not_expanded() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));
    let ignorer = Arc::new(IgnoreMatcher::new("/sync", &[r"(?:.*/)?\.git"]).unwrap());

    let report = DiscoveryEngine::naive(remote.clone(), Box::new(AlwaysSync), Some(ignorer))
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert!(registry.is_mapped(&rid("G")));
    assert!(!registry.is_mapped(&rid("O")));
    assert_eq!(report.ignored, 1);
    assert!(!remote.listings().contains(&rid("G")));
    // ignoring is intentional, the parent stays up to date
    assert!(registry.lookup_by_id(&rid("A")).unwrap().subdirs_up_to_date());
}

#[tokio::test]
async fn test_from_config_breadth_first_with_depth_limit() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));
    let config = DiscoveryConfig {
        max_depth: Some(1),
        traversal: "bfs".to_string(),
        new_folders: "never".to_string(),
        checkpoint_every: 0,
    };

    let report = DiscoveryEngine::from_config(remote.clone(), &config, None)
        .unwrap()
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    // R at depth 0, A and C at depth 1, B and G at depth 2 (mapped, pruned)
    assert_eq!(remote.listings(), vec![rid("R"), rid("A"), rid("C")]);
    assert!(registry.is_mapped(&rid("B")));
    assert!(!registry.is_mapped(&rid("O")));
    assert_eq!(report.depth_limited, 2);
    // pruning below A leaves R incomplete too
    assert!(!registry.root_node().subdirs_up_to_date());
    assert!(!registry.lookup_by_id(&rid("A")).unwrap().subdirs_up_to_date());
    assert!(registry.lookup_by_id(&rid("C")).unwrap().subdirs_up_to_date());
}

#[tokio::test]
async fn test_depth_pruning_clears_every_ancestor() {
    let remote = FakeRemote::new();
    remote.add_folder("A", "a", "R");
    remote.add_folder("B", "b", "A");
    remote.add_folder("O", "o", "B");
    let mut registry = registry_at(Path::new("/sync"));

    let report = DiscoveryEngine::depth_limited(remote.clone(), Box::new(AlwaysSync), Box::new(NoFilter), 1)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(report.depth_limited, 1);
    assert!(registry.is_mapped(&rid("B")));
    assert!(!registry.is_mapped(&rid("O")));
    assert!(!registry.root_node().subdirs_up_to_date());
    assert!(!registry.lookup_by_id(&rid("A")).unwrap().subdirs_up_to_date());
    assert!(!registry.lookup_by_id(&rid("B")).unwrap().subdirs_up_to_date());

    // an unbounded pass afterwards completes the whole chain
    DiscoveryEngine::naive(remote, Box::new(AlwaysSync), None)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();
    assert!(registry.is_mapped(&rid("O")));
    assert!(registry.root_node().subdirs_up_to_date());
    assert!(registry.lookup_by_id(&rid("A")).unwrap().subdirs_up_to_date());
}

#[tokio::test]
async fn test_skip_up_to_date_does_not_list_again() {
    let remote = FakeRemote::new();
    remote.add_folder("A", "a", "R");
    remote.add_folder("B", "b", "A");
    let mut registry = registry_at(Path::new("/sync"));

    DiscoveryEngine::naive(remote.clone(), Box::new(AlwaysSync), None)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();
    assert_eq!(remote.listings().len(), 3);
    let once = registry.clone();

    let second = DiscoveryEngine::naive(remote.clone(), Box::new(AlwaysSync), None)
        .with_skip_up_to_date(true)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(remote.listings().len(), 3);
    assert_eq!(second.skipped_up_to_date, 3);
    assert_eq!(second.folders_expanded, 0);
    assert_eq!(registry, once);
}

#[tokio::test]
async fn test_skip_up_to_date_lists_incomplete_subtrees() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));

    DiscoveryEngine::depth_limited(remote.clone(), Box::new(AlwaysSync), Box::new(NoFilter), 1)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();
    // R, A, C
    assert_eq!(remote.listings().len(), 3);

    let second = DiscoveryEngine::naive(remote.clone(), Box::new(AlwaysSync), None)
        .with_skip_up_to_date(true)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    // C was complete; R and A are listed again, then B, G and O for the first time
    assert_eq!(second.skipped_up_to_date, 1);
    assert_eq!(remote.listings().len(), 3 + 5);
    assert!(!remote.listings()[3..].contains(&rid("C")));
    assert!(registry.is_mapped(&rid("O")));
    assert!(registry.root_node().subdirs_up_to_date());
}

#[tokio::test]
async fn test_from_config_rejects_unknown_policy() {
    let remote = sample_remote();
    let config = DiscoveryConfig {
        new_folders: "sometimes".to_string(),
        ..DiscoveryConfig::default()
    };
    let err = DiscoveryEngine::from_config(remote, &config, None).err().unwrap();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn test_unmapped_start_is_invalid_argument() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));

    let err = DiscoveryEngine::naive(remote, Box::new(AlwaysSync), None)
        .run(&mut registry, &rid("A"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[tokio::test]
async fn test_cancellation_invalidates_pending_folders() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let report = DiscoveryEngine::naive(remote.clone(), Box::new(AlwaysSync), None)
        .with_cancellation(cancel)
        .with_callback(Box::new(move |_registry: &mut MappingRegistry, _folder: &RemoteFolder| {
            trigger.cancel()
        }))
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.folders_expanded, 1);
    assert_eq!(remote.listings(), vec![rid("R")]);
    assert!(registry.is_mapped(&rid("A")));
    assert!(!registry.root_node().subdirs_up_to_date());
    assert!(!registry.lookup_by_id(&rid("A")).unwrap().subdirs_up_to_date());
}

#[tokio::test]
async fn test_remote_failure_aborts_but_keeps_mappings() {
    let remote = sample_remote();
    remote.fail_listing_of("A");
    let mut registry = registry_at(Path::new("/sync"));

    let err = DiscoveryEngine::naive(remote.clone(), Box::new(AlwaysSync), None)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Remote(_)));
    assert!(registry.is_mapped(&rid("A")));
    assert!(registry.is_mapped(&rid("C")));
    assert!(!registry.root_node().subdirs_up_to_date());
}

#[tokio::test]
async fn test_checkpoints_persist_map_file() {
    let dir = tempfile::tempdir().unwrap();
    let map_path = dir.path().join("map.json");
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));

    let report = DiscoveryEngine::naive(remote, Box::new(AlwaysSync), None)
        .with_checkpoint(&map_path, 2)
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(report.checkpoints, 3);
    let reloaded = MapFile::load(&map_path).unwrap();
    assert_eq!(reloaded, registry);
}

#[tokio::test]
async fn test_callback_can_adjust_sync_flags() {
    let remote = sample_remote();
    let mut registry = registry_at(Path::new("/sync"));

    DiscoveryEngine::naive(remote, Box::new(AlwaysSync), None)
        .with_callback(Box::new(|registry: &mut MappingRegistry, folder: &RemoteFolder| {
            if folder.name == "music" {
                let _ = registry.set_sync(&folder.id, false);
            }
        }))
        .run(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert!(!registry.lookup_by_id(&rid("C")).unwrap().sync());
    assert!(registry.lookup_by_id(&rid("A")).unwrap().sync());
}
