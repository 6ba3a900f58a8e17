//! Directory syncer and whole-tree runner tests
//!
//! Uses the real local filesystem adapter on a temporary directory.

use std::path::Path;
use std::sync::Arc;

use drivemap_core::domain::{MapFile, MappingError};
use drivemap_core::ports::ILocalFileSystem;
use drivemap_sync::{sync_all, DirectorySyncer, LocalFileSystemAdapter, SyncError};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::common::{at, registry_at, rid, FakeRemote};

fn syncer(remote: &Arc<FakeRemote>) -> DirectorySyncer {
    DirectorySyncer::new(remote.clone(), Arc::new(LocalFileSystemAdapter::new()))
}

async fn local_file(path: &Path, data: &[u8], modified: chrono::DateTime<chrono::Utc>) {
    let fs = LocalFileSystemAdapter::new();
    fs.write_file(path, data).await.unwrap();
    fs.set_modified(path, modified).await.unwrap();
}

#[tokio::test]
async fn test_only_newer_remote_file_is_downloaded() {
    let dir = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.add_file("F1", "a.txt", "R", at(2024, 5, 1), b"new a");
    remote.add_file("F2", "b.txt", "R", at(2024, 1, 1), b"b");
    local_file(&dir.path().join("a.txt"), b"old a", at(2023, 1, 1)).await;
    local_file(&dir.path().join("b.txt"), b"b", at(2024, 1, 1)).await;
    let mut registry = registry_at(dir.path());

    let report = syncer(&remote)
        .sync_directory(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(remote.downloads(), vec![rid("F1")]);
    assert_eq!(report.files_downloaded, 1);
    assert_eq!(report.files_up_to_date, 1);
    assert_eq!(std::fs::read(dir.path().join("a.txt")).unwrap(), b"new a");

    let state = LocalFileSystemAdapter::new()
        .get_state(&dir.path().join("a.txt"))
        .await
        .unwrap();
    assert_eq!(state.modified, Some(at(2024, 5, 1)));
}

#[tokio::test]
async fn test_fresh_sync_materializes_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("drive");
    let map_path = dir.path().join("state").join("map.json");
    let remote = FakeRemote::new();
    remote.add_folder("A", "docs", "R");
    remote.add_file("F1", "a.txt", "R", at(2024, 5, 1), b"hello");
    remote.add_native("D1", "Notes", "R", "application/vnd.google-apps.document", at(2024, 5, 2));
    remote.add_native("Q1", "Survey", "R", "application/vnd.google-apps.form", at(2024, 5, 3));
    remote.add_file("F2", "inner.txt", "A", at(2024, 5, 1), b"inner");
    let mut registry = registry_at(&root);

    let report = syncer(&remote)
        .with_map_file(&map_path)
        .sync_directory(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(report.directories_created, 2);
    assert_eq!(report.mappings_created, 1);
    assert_eq!(report.files_downloaded, 1);
    assert_eq!(report.shortcuts_written, 1);
    assert_eq!(report.files_skipped, 1);

    assert!(root.join("docs").is_dir());
    assert!(!root.join("docs").join("inner.txt").exists());
    assert_eq!(std::fs::read(root.join("a.txt")).unwrap(), b"hello");

    let shortcut: serde_json::Value =
        serde_json::from_slice(&std::fs::read(root.join("Notes.gdoc")).unwrap()).unwrap();
    assert_eq!(shortcut["doc_id"], "D1");
    assert_eq!(shortcut["resource_id"], "document:D1");

    let docs = registry.lookup_by_id(&rid("A")).unwrap();
    assert!(docs.sync());
    assert_eq!(docs.local_path(), root.join("docs"));

    let reloaded = MapFile::load(&map_path).unwrap();
    assert_eq!(reloaded, registry);
}

#[tokio::test]
async fn test_second_sync_downloads_nothing() {
    let dir = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.add_file("F1", "a.txt", "R", at(2024, 5, 1), b"hello");
    remote.add_native("D1", "Notes", "R", "application/vnd.google-apps.spreadsheet", at(2024, 5, 2));
    let mut registry = registry_at(dir.path());
    let syncer = syncer(&remote);

    syncer.sync_directory(&mut registry, &rid("R")).await.unwrap();
    let second = syncer.sync_directory(&mut registry, &rid("R")).await.unwrap();

    assert_eq!(remote.downloads(), vec![rid("F1")]);
    assert_eq!(second.files_up_to_date, 2);
    assert_eq!(second.shortcuts_written, 0);
}

#[tokio::test]
async fn test_unsynced_mapping_is_not_created() {
    let dir = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.add_folder("A", "docs", "R");
    let mut registry = registry_at(dir.path());
    registry.register_child(rid("A"), "docs", false, &rid("R")).unwrap();

    let report = syncer(&remote)
        .sync_directory(&mut registry, &rid("R"))
        .await
        .unwrap();

    assert_eq!(report.unsynced_skipped, 1);
    assert!(!dir.path().join("docs").exists());
}

#[tokio::test]
async fn test_file_in_place_of_directory_is_illegal_state() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("docs"), b"not a directory").unwrap();
    let remote = FakeRemote::new();
    remote.add_folder("A", "docs", "R");
    let mut registry = registry_at(dir.path());

    let err = syncer(&remote)
        .sync_directory(&mut registry, &rid("R"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Mapping(MappingError::IllegalState(_))));
}

#[tokio::test]
async fn test_unsynced_node_is_rejected() {
    let dir = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    let mut registry = registry_at(dir.path());
    registry.set_sync(&rid("R"), false).unwrap();

    let err = syncer(&remote)
        .sync_directory(&mut registry, &rid("R"))
        .await
        .unwrap_err();

    assert!(err.is_invalid_argument());
    assert!(remote.listings().is_empty());
}

#[tokio::test]
async fn test_sync_all_follows_new_mappings() {
    let dir = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.add_folder("A", "docs", "R");
    remote.add_folder("B", "old", "R");
    remote.add_file("F1", "a.txt", "R", at(2024, 5, 1), b"a");
    remote.add_file("F2", "inner.txt", "A", at(2024, 5, 1), b"inner");
    let mut registry = registry_at(dir.path());
    registry.register_child(rid("B"), "old", false, &rid("R")).unwrap();

    let summary = sync_all(&syncer(&remote), &mut registry, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.directories, 2);
    assert_eq!(summary.totals.files_downloaded, 2);
    assert!(!summary.cancelled);
    assert_eq!(
        std::fs::read(dir.path().join("docs").join("inner.txt")).unwrap(),
        b"inner"
    );
    assert!(!dir.path().join("old").exists());
}

#[tokio::test]
async fn test_sync_all_reaches_synced_folder_below_unsynced_parent() {
    let dir = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.add_folder("B", "old", "R");
    remote.add_folder("C", "keep", "B");
    remote.add_file("F1", "skipped.txt", "B", at(2024, 5, 1), b"skipped");
    remote.add_file("F2", "kept.txt", "C", at(2024, 5, 1), b"kept");
    let mut registry = registry_at(dir.path());
    registry.register_child(rid("B"), "old", false, &rid("R")).unwrap();
    registry.register_child(rid("C"), "keep", true, &rid("B")).unwrap();

    let summary = sync_all(&syncer(&remote), &mut registry, &CancellationToken::new())
        .await
        .unwrap();

    // R and C; B itself is never synced
    assert_eq!(summary.directories, 2);
    assert_eq!(remote.downloads(), vec![rid("F2")]);
    assert_eq!(
        std::fs::read(dir.path().join("old").join("keep").join("kept.txt")).unwrap(),
        b"kept"
    );
    assert!(!dir.path().join("old").join("skipped.txt").exists());
}

#[tokio::test]
async fn test_sync_all_stops_when_cancelled() {
    let dir = TempDir::new().unwrap();
    let remote = FakeRemote::new();
    remote.add_file("F1", "a.txt", "R", at(2024, 5, 1), b"a");
    let mut registry = registry_at(dir.path());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = sync_all(&syncer(&remote), &mut registry, &cancel).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.directories, 0);
    assert!(remote.downloads().is_empty());
}
