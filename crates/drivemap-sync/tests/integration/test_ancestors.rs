//! Ancestor mapping tests

use std::path::{Path, PathBuf};

use drivemap_sync::AncestorMapper;

use crate::common::{at, registry_at, rid, FakeRemote};

#[tokio::test]
async fn test_maps_missing_chain_top_down() {
    let remote = FakeRemote::new();
    remote.add_top_folder("R", "My Drive");
    remote.add_folder("A", "docs", "R");
    remote.add_folder("B", "work", "A");
    remote.add_folder("C", "2024", "B");
    let mut registry = registry_at(Path::new("/sync"));

    let handle = AncestorMapper::new(remote)
        .map_with_ancestors(&mut registry, &rid("C"))
        .await
        .unwrap();

    assert_eq!(registry.handle(&rid("C")), Some(handle));
    for id in ["A", "B", "C"] {
        assert!(registry.lookup_by_id(&rid(id)).unwrap().sync(), "{id} should sync");
    }
    assert_eq!(
        registry.lookup_by_id(&rid("C")).unwrap().local_path(),
        PathBuf::from("/sync/docs/work/2024")
    );
    assert_eq!(registry.parent_of(&rid("B")).unwrap().remote_id(), &rid("A"));
}

#[tokio::test]
async fn test_stops_at_first_mapped_ancestor() {
    let remote = FakeRemote::new();
    remote.add_folder("A", "docs", "R");
    remote.add_folder("B", "work", "A");
    let mut registry = registry_at(Path::new("/sync"));
    registry.register_child(rid("A"), "Documents", false, &rid("R")).unwrap();

    AncestorMapper::new(remote)
        .map_with_ancestors(&mut registry, &rid("B"))
        .await
        .unwrap();

    assert_eq!(
        registry.lookup_by_id(&rid("B")).unwrap().local_path(),
        PathBuf::from("/sync/Documents/work")
    );
    // the existing ancestor keeps its flag
    assert!(!registry.lookup_by_id(&rid("A")).unwrap().sync());
}

#[tokio::test]
async fn test_already_mapped_is_returned_as_is() {
    let remote = FakeRemote::new();
    let mut registry = registry_at(Path::new("/sync"));
    let root = registry.root();

    let handle = AncestorMapper::new(remote)
        .map_with_ancestors(&mut registry, &rid("R"))
        .await
        .unwrap();
    assert_eq!(handle, root);
}

#[tokio::test]
async fn test_rejects_files_and_foreign_folders() {
    let remote = FakeRemote::new();
    remote.add_file("F", "a.txt", "R", at(2024, 1, 1), b"a");
    remote.add_top_folder("Z", "Shared drive");
    remote.add_folder("Y", "shared docs", "Z");
    let mut registry = registry_at(Path::new("/sync"));
    let mapper = AncestorMapper::new(remote);

    let err = mapper.map_with_ancestors(&mut registry, &rid("F")).await.unwrap_err();
    assert!(err.is_invalid_argument());

    let err = mapper.map_with_ancestors(&mut registry, &rid("Y")).await.unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(!registry.is_mapped(&rid("Y")));
}
