//! End-to-end tests for the `repo-mirror` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;

mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::{
    ROOT_LISTING, dir_entry, file_entry, listing_url, mount_file, mount_listing, mount_status,
};

#[test]
fn test_binary_help_lists_insecure_flag() {
    Command::cargo_bin("repo-mirror")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--insecure"))
        .stdout(predicate::str::contains("--concurrency"));
}

#[test]
fn test_binary_rejects_invalid_url() {
    let temp = TempDir::new().unwrap();
    Command::cargo_bin("repo-mirror")
        .unwrap()
        .current_dir(temp.path())
        .args(["--url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

#[tokio::test]
async fn test_binary_mirrors_tree_and_writes_manifest() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_listing(
        &server,
        "",
        json!([file_entry(&server, "a.txt"), dir_entry(&server, "sub")]),
    )
    .await;
    mount_listing(&server, "sub", json!([file_entry(&server, "b.txt")])).await;
    mount_file(&server, "a.txt", b"hello").await;
    mount_file(&server, "b.txt", b"world").await;

    let temp = TempDir::new().unwrap();
    Command::cargo_bin("repo-mirror")
        .unwrap()
        .current_dir(temp.path())
        .args(["--url", &listing_url(&server, ""), "--output", "root", "-q"])
        .assert()
        .success();

    let manifest = std::fs::read_to_string(temp.path().join("hashes.csv")).unwrap();
    let sub_b = std::path::Path::new("root").join("sub").join("b.txt");
    let expected = format!(
        "root{}a.txt, 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\n\
         {}, 486ea46224d1bb4fb680f34f7c9ad96a8f24ec88be73ea8e5a6c65260e9cb8a7\n",
        std::path::MAIN_SEPARATOR,
        sub_b.display()
    );
    assert_eq!(manifest, expected);
}

#[tokio::test]
async fn test_binary_exits_zero_on_partial_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_listing(
        &server,
        "",
        json!([file_entry(&server, "ok.txt"), file_entry(&server, "missing.txt")]),
    )
    .await;
    mount_file(&server, "ok.txt", b"hello").await;
    mount_status(&server, "/raw/missing.txt", 404).await;

    let temp = TempDir::new().unwrap();
    // Leftovers from an earlier run.
    std::fs::create_dir_all(temp.path().join("out").join("old")).unwrap();
    std::fs::write(temp.path().join("out").join("missing.txt"), b"stale").unwrap();
    std::fs::write(temp.path().join("out").join("old").join("left.txt"), b"stale").unwrap();
    Command::cargo_bin("repo-mirror")
        .unwrap()
        .current_dir(temp.path())
        .args(["-u", &listing_url(&server, ""), "-o", "out", "-m", "report/hashes.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing.txt"));

    let manifest = std::fs::read_to_string(temp.path().join("report").join("hashes.csv")).unwrap();
    assert_eq!(manifest.lines().count(), 1);
    assert!(manifest.contains("ok.txt"));
    assert!(!manifest.contains("missing.txt"));
    assert!(!manifest.contains("left.txt"));
    assert!(!temp.path().join("out").join("missing.txt").exists());
}

#[tokio::test]
async fn test_binary_exits_zero_when_root_listing_fails() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_status(&server, ROOT_LISTING, 500).await;

    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("temp")).unwrap();
    std::fs::write(temp.path().join("temp").join("earlier.txt"), b"stale").unwrap();
    Command::cargo_bin("repo-mirror")
        .unwrap()
        .current_dir(temp.path())
        .args(["-u", &listing_url(&server, "")])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing mirrored"));

    let manifest = std::fs::read_to_string(temp.path().join("hashes.csv")).unwrap();
    assert!(manifest.is_empty());
}
