//! Shared helpers for wiremock-backed integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Listing path for the mirror root on the mock server.
pub const ROOT_LISTING: &str = "/api/v1/repos/org/repo/contents/";

/// Returns the listing URL for `dir` ("" for the root).
pub fn listing_url(server: &MockServer, dir: &str) -> String {
    format!("{}{ROOT_LISTING}{dir}", server.uri())
}

/// Builds a `file` listing entry served from `/raw/<name>`.
pub fn file_entry(server: &MockServer, name: &str) -> Value {
    json!({
        "type": "file",
        "name": name,
        "download_url": format!("{}/raw/{name}", server.uri()),
    })
}

/// Builds a `dir` listing entry whose listing lives under the root listing path.
pub fn dir_entry(server: &MockServer, name: &str) -> Value {
    json!({
        "type": "dir",
        "name": name,
        "url": listing_url(server, name),
        "download_url": null,
    })
}

/// Serves `entries` as the listing of `dir` ("" for the root).
pub async fn mount_listing(server: &MockServer, dir: &str, entries: Value) {
    Mock::given(method("GET"))
        .and(path(format!("{ROOT_LISTING}{dir}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(entries))
        .mount(server)
        .await;
}

/// Serves `body` at `/raw/<name>`.
pub async fn mount_file(server: &MockServer, name: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/raw/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Answers `request_path` with `status` and a JSON error body.
pub async fn mount_status(server: &MockServer, request_path: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(request_path.to_string()))
        .respond_with(
            ResponseTemplate::new(status).set_body_json(json!({"message": "upstream says no"})),
        )
        .mount(server)
        .await;
}
