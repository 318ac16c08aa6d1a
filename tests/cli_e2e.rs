//! End-to-end CLI tests for the crossupload binary.

#![allow(deprecated)]

mod support;
use support::socket_guard::start_mock_server_or_skip;

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command isolated from the user's real config locations.
fn isolated(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crossupload").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env("HOME", dir.join("home"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("crossupload").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("cross-upload candidates"))
        .stdout(predicate::str::contains("--strict"));
}

#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("crossupload").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("crossupload"));
}

#[test]
fn test_binary_requires_target() {
    let mut cmd = Command::cargo_bin("crossupload").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("<TARGET>"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("crossupload").unwrap();
    cmd.args(["1", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    isolated(dir.path())
        .arg("123")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no config file found"));
}

#[test]
fn test_binary_invalid_config_reports_field() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[trackers.red]\nurl = \"https://red.example\"\napi_key = \"k\"\n",
    )
    .unwrap();
    isolated(dir.path())
        .arg("123")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least two trackers"));
}

#[test]
fn test_binary_unknown_url_host_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[trackers.red]\nurl = \"https://red.example\"\napi_key = \"k\"\n\n\
         [trackers.ops]\nurl = \"https://ops.example\"\napi_key = \"k\"\n",
    )
    .unwrap();
    isolated(dir.path())
        .arg("https://elsewhere.example/collages.php?id=1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no configured tracker matches"));
}

async fn mount(server: &MockServer, action: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(query_param("action", action))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_binary_reports_missing_group_candidates() {
    let Some(source) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(target) = start_mock_server_or_skip().await else {
        return;
    };
    let torrent = json!({
        "id": 11, "media": "CD", "format": "FLAC", "encoding": "Lossless",
        "size": 1000, "remasterYear": 1999, "remasterTitle": "",
        "remasterRecordLabel": "Label", "remasterCatalogueNumber": "CAT"
    });
    mount(
        &source,
        "torrentgroup",
        json!({"status": "success", "response": {
            "group": {"id": 5, "name": "Album", "year": 1999,
                      "musicInfo": {"artists": [{"name": "Band"}]}},
            "torrents": [torrent]
        }}),
    )
    .await;
    mount(&source, "browse", json!({"status": "success", "response": {"results": []}})).await;
    mount(&target, "browse", json!({"status": "success", "response": {"results": []}})).await;

    let dir = TempDir::new().unwrap();
    let config = format!(
        "[trackers.red]\nurl = \"{}\"\napi_key = \"k\"\n\n\
         [trackers.ops]\nurl = \"{}\"\napi_key = \"k\"\n\n\
         [http]\nmin_interval_ms = 0\n",
        source.uri(),
        target.uri()
    );
    std::fs::write(dir.path().join("config.toml"), config).unwrap();

    isolated(dir.path())
        .args(["5", "--tracker", "red", "-q", "--verbose-report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[missing group] (1)"))
        .stdout(predicate::str::contains(format!(
            "{}/torrents.php?torrentid=11",
            source.uri()
        )))
        .stdout(predicate::str::contains("not found on OPS"));
}
