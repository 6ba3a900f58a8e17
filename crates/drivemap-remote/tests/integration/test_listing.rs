//! Integration tests for paginated listings
//!
//! Verifies against a wiremock-based Drive API mock server:
//! - Child folder listing across several pages
//! - Full folder crawl listing
//! - Contents listing with files and folders
//! - Request shape (auth header, fields, page size)

use drivemap_core::ports::IRemoteStorage;
use drivemap_remote::listing;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, rid};

#[tokio::test]
async fn test_list_child_folders_follows_pages() {
    let (server, storage) = common::setup_drive_mock().await;
    let q = listing::child_folders_query(&rid("R"));

    common::mount_list_paginated(
        &server,
        &q,
        serde_json::json!([
            common::folder_json("A", "docs", "R"),
            common::folder_json("B", "music", "R")
        ]),
        serde_json::json!([common::folder_json("C", "photos", "R")]),
    )
    .await;

    let folders = storage
        .list_child_folders(&rid("R"))
        .await
        .expect("child folder listing failed");

    let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["docs", "music", "photos"]);
    assert!(folders.iter().all(|f| f.primary_parent() == Some(&rid("R"))));
}

#[tokio::test]
async fn test_list_all_folders() {
    let (server, storage) = common::setup_drive_mock().await;

    common::mount_list_single_page(
        &server,
        &listing::all_folders_query(),
        serde_json::json!([
            common::folder_json("A", "docs", "R"),
            common::folder_json("B", "2024", "A")
        ]),
    )
    .await;

    let folders = storage.list_all_folders().await.expect("crawl listing failed");
    assert_eq!(folders.len(), 2);
    assert_eq!(folders[1].primary_parent(), Some(&rid("A")));
}

#[tokio::test]
async fn test_list_contents_mixes_files_and_folders() {
    let (server, storage) = common::setup_drive_mock().await;

    common::mount_list_single_page(
        &server,
        &listing::contents_query(&rid("A")),
        serde_json::json!([
            common::folder_json("B", "2024", "A"),
            common::file_json("F1", "a.txt", "A", "2024-05-01T10:00:00Z", 12)
        ]),
    )
    .await;

    let items = storage.list_contents(&rid("A")).await.expect("contents listing failed");

    assert_eq!(items.len(), 2);
    assert!(items[0].is_folder());
    assert!(!items[1].is_folder());
    assert_eq!(items[1].size, Some(12));
    assert!(items[1].modified.is_some());
}

#[tokio::test]
async fn test_listing_sends_auth_fields_and_page_size() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(query_param("pageSize", "2"))
        .and(query_param(
            "fields",
            format!("nextPageToken,files({})", listing::FILE_FIELDS),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let folders = storage.list_child_folders(&rid("R")).await.unwrap();
    assert!(folders.is_empty());
}

#[tokio::test]
async fn test_listing_server_error_is_reported() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(&server)
        .await;

    let result = storage.list_child_folders(&rid("R")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_listing_malformed_body_is_invalid_response() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = storage.list_child_folders(&rid("R")).await.unwrap_err();
    let remote = err.downcast_ref::<drivemap_remote::RemoteError>();
    assert!(matches!(remote, Some(drivemap_remote::RemoteError::InvalidResponse(_))));
}
