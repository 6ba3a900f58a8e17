//! Integration tests for metadata, download, upload and lookup
//!
//! Verifies end-to-end behavior of `DriveRemoteStorage` against a
//! wiremock-based Drive API mock server, including 404 handling and
//! HTTP 429 back-off.

use drivemap_core::ports::IRemoteStorage;
use drivemap_remote::{listing, DriveClient, DriveRemoteStorage, RemoteError};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, rid};

// ============================================================================
// Metadata / download
// ============================================================================

#[tokio::test]
async fn test_get_metadata() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/F1"))
        .and(query_param("fields", listing::FILE_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "F1",
            "name": "Budget",
            "parents": ["A"],
            "mimeType": "application/vnd.google-apps.spreadsheet",
            "modifiedTime": "2024-05-01T10:00:00Z",
            "webViewLink": "https://docs.example/F1"
        })))
        .mount(&server)
        .await;

    let item = storage.get_metadata(&rid("F1")).await.expect("metadata failed");
    assert_eq!(item.name, "Budget");
    assert_eq!(item.native_extension(), Some("gsheet"));
    assert_eq!(item.web_view_link.as_deref(), Some("https://docs.example/F1"));
    assert_eq!(item.size, None);
}

#[tokio::test]
async fn test_get_metadata_not_found_is_error() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = storage.get_metadata(&rid("missing")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_download_returns_content() {
    let (server, storage) = common::setup_drive_mock().await;

    let content = b"Hello, Drive! This is test content.";
    common::mount_download(&server, "F1", content).await;

    let data = storage.download(&rid("F1")).await.expect("download failed");
    assert_eq!(data, content);
}

#[tokio::test]
async fn test_download_empty_file() {
    let (server, storage) = common::setup_drive_mock().await;
    common::mount_download(&server, "empty-001", &[]).await;

    let data = storage.download(&rid("empty-001")).await.expect("empty download failed");
    assert!(data.is_empty());
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn test_upload_creates_then_sends_media() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/files"))
        .and(body_json(serde_json::json!({ "name": "notes.txt", "parents": ["A"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "NEW1",
            "name": "notes.txt",
            "parents": ["A"],
            "mimeType": "text/plain"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/upload/files/NEW1"))
        .and(query_param("uploadType", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json(
            "NEW1",
            "notes.txt",
            "A",
            "2024-06-01T08:00:00Z",
            5,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let item = storage
        .upload("notes.txt", &rid("A"), b"hello")
        .await
        .expect("upload failed");

    assert_eq!(item.id, rid("NEW1"));
    assert_eq!(item.size, Some(5));
}

// ============================================================================
// Lookup by name
// ============================================================================

#[tokio::test]
async fn test_find_folders_by_name() {
    let (server, storage) = common::setup_drive_mock().await;

    common::mount_list_single_page(
        &server,
        &listing::folders_by_name_query("docs", Some(&rid("R"))),
        serde_json::json!([common::folder_json("A", "docs", "R")]),
    )
    .await;

    let found = storage
        .find_folders_by_name("docs", Some(&rid("R")))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, rid("A"));
}

#[tokio::test]
async fn test_find_folders_by_name_404_is_empty() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found: GONE"))
        .mount(&server)
        .await;

    let found = storage
        .find_folders_by_name("docs", Some(&rid("GONE")))
        .await
        .expect("404 must not be an error");
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_find_folders_by_name_unauthorized_is_error() {
    let (server, storage) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(storage.find_folders_by_name("docs", None).await.is_err());
}

// ============================================================================
// 429 handling
// ============================================================================

#[tokio::test]
async fn test_429_is_retried_after_retry_after() {
    let server = MockServer::start().await;
    let storage = DriveRemoteStorage::new(
        DriveClient::with_base_url("token", server.uri()).with_max_retries(2),
    );

    Mock::given(method("GET"))
        .and(path("/files/F1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    common::mount_download(&server, "F1", b"after retry").await;

    let data = storage.download(&rid("F1")).await.expect("retry failed");
    assert_eq!(data, b"after retry");
}

#[tokio::test]
async fn test_429_retry_limit_exhausted() {
    let server = MockServer::start().await;
    let storage = DriveRemoteStorage::new(
        DriveClient::with_base_url("token", server.uri()).with_max_retries(1),
    );

    Mock::given(method("GET"))
        .and(path("/files/F1"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(2)
        .mount(&server)
        .await;

    let err = storage.download(&rid("F1")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::TooManyRequests { .. })
    ));
}
