//! Shared test helpers for Drive API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! necessary mock endpoints against a running server.

use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivemap_core::domain::newtypes::RemoteId;
use drivemap_remote::{DriveClient, DriveRemoteStorage};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Starts a mock server and returns a (MockServer, DriveRemoteStorage) tuple
/// whose client has no 429 retries left unless asked for.
pub async fn setup_drive_mock() -> (MockServer, DriveRemoteStorage) {
    let server = MockServer::start().await;
    let client = DriveClient::with_base_url("test-access-token", server.uri()).with_page_size(2);
    (server, DriveRemoteStorage::new(client))
}

pub fn rid(s: &str) -> RemoteId {
    RemoteId::new(s.to_string()).unwrap()
}

/// JSON for a folder resource
pub fn folder_json(id: &str, name: &str, parent: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "parents": [parent],
        "mimeType": FOLDER_MIME,
        "modifiedTime": "2024-01-01T00:00:00Z"
    })
}

/// JSON for a regular file resource
pub fn file_json(id: &str, name: &str, parent: &str, modified: &str, size: u64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "parents": [parent],
        "mimeType": "text/plain",
        "modifiedTime": modified,
        "size": size.to_string()
    })
}

/// Mounts a single-page `files.list` response for query `q`
pub async fn mount_list_single_page(server: &MockServer, q: &str, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts a two-page `files.list` response for query `q`
///
/// The first request (no pageToken) returns page 1 with a nextPageToken;
/// the request carrying that token returns page 2.
pub async fn mount_list_paginated(
    server: &MockServer,
    q: &str,
    page1: serde_json::Value,
    page2: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page1,
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("q", q))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page2
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts a download endpoint returning the given content
pub async fn mount_download(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}")))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}
