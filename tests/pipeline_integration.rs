//! End-to-end pipeline tests: source and target trackers are mock servers.

mod support;
use support::socket_guard::start_mock_server_or_skip;

use std::sync::Arc;
use std::time::Duration;

use crossupload_core::api::{ClientOptions, RetryPolicy, ServerPacer, TrackerClient};
use crossupload_core::compare::{
    EncodingStatus, PRIORITY_MISSING_GROUP, PRIORITY_NEW_EDITION, PRIORITY_NEW_ENCODING,
};
use crossupload_core::crossup::{CrossUploader, RunSettings, Target, render, render_report};
use crossupload_core::tracker::TrackerConfig;
use serde_json::{Value, json};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, name: &str) -> TrackerClient {
    let options = ClientOptions {
        min_interval: Duration::ZERO,
        retry_policy: RetryPolicy::new(1, Duration::from_millis(10)),
        ..ClientOptions::default()
    };
    let tracker = TrackerConfig::new(name, server.uri(), "k");
    TrackerClient::with_pacer(tracker, options, Arc::new(ServerPacer::new())).unwrap()
}

fn uploader(source: &MockServer, target: &MockServer) -> CrossUploader {
    CrossUploader::new(client(source, "red"), client(target, "ops"), RunSettings::default())
}

fn torrent(id: i64, media: &str, encoding: &str, size: u64, year: i64, label: &str, cat: &str) -> Value {
    let format = if encoding.contains("Lossless") { "FLAC" } else { "MP3" };
    json!({
        "id": id,
        "torrentId": id,
        "media": media,
        "format": format,
        "encoding": encoding,
        "size": size,
        "remasterYear": year,
        "remasterTitle": "",
        "remasterRecordLabel": label,
        "remasterCatalogueNumber": cat,
    })
}

fn source_torrents() -> Vec<Value> {
    vec![
        torrent(1, "CD", "Lossless", 500_000, 2001, "Label", "CAT-1"),
        torrent(2, "CD", "320", 100_000, 2001, "Label", "CAT-1"),
        torrent(3, "CD", "24bit Lossless", 900_000, 2001, "Label", "CAT-1"),
        torrent(4, "WEB", "Lossless", 450_000, 2010, "Reissue Label", "CAT-2"),
    ]
}

fn torrentgroup(group_id: i64, torrents: &[Value]) -> Value {
    json!({
        "status": "success",
        "response": {
            "group": {
                "id": group_id,
                "name": "Album",
                "year": 2001,
                "releaseType": 1,
                "musicInfo": {"artists": [{"name": "Band"}]}
            },
            "torrents": torrents
        }
    })
}

fn browse(results: &[Value]) -> Value {
    json!({"status": "success", "response": {"results": results}})
}

async fn mount(server: &MockServer, action: &str, body: Value) {
    Mock::given(method("GET"))
        .and(query_param("action", action))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_source(server: &MockServer) {
    mount(server, "torrentgroup", torrentgroup(100, &source_torrents())).await;
    mount(
        server,
        "browse",
        browse(&[json!({
            "groupId": 100, "groupName": "Album", "artist": "Band", "groupYear": 2001,
            "torrents": source_torrents()
        })]),
    )
    .await;
}

#[tokio::test]
async fn test_group_target_yields_edition_and_encoding_candidates() {
    let Some(source) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(target) = start_mock_server_or_skip().await else {
        return;
    };
    mount_source(&source).await;
    mount(
        &target,
        "browse",
        browse(&[json!({"groupId": 200, "groupName": "Album", "artist": "Band", "groupYear": 2001})]),
    )
    .await;
    mount(
        &target,
        "torrentgroup",
        torrentgroup(200, &[torrent(50, "CD", "Lossless", 500_000, 2001, "Label", "CAT-1")]),
    )
    .await;

    let uploader = uploader(&source, &target);
    let entries = uploader
        .load_entries(&Target::Group {
            tracker: "red".into(),
            group_id: 100,
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);

    let outcome = uploader.process_entry(&entries[0]).await.unwrap();
    assert_eq!(outcome.target_group.as_ref().unwrap().group_id, 200);
    assert_eq!(outcome.matches.len(), 2);
    assert_eq!(outcome.matches[0].confidence, 90);
    assert!(!outcome.matches[1].is_matched());

    let cd = &outcome.comparisons[0].media_comparisons[0];
    let statuses: Vec<(&str, EncodingStatus)> = cd
        .encodings
        .iter()
        .map(|e| (e.encoding.as_str(), e.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("24bit Lossless", EncodingStatus::Candidate),
            ("320", EncodingStatus::Ignored),
            ("Lossless", EncodingStatus::ExactSize),
        ]
    );

    let found: Vec<(i64, u8)> = outcome
        .candidates
        .iter()
        .map(|c| (c.source_torrent.torrent_id, c.priority))
        .collect();
    assert_eq!(found, vec![(4, PRIORITY_NEW_EDITION), (3, PRIORITY_NEW_ENCODING)]);

    let verbose = render(
        &outcome,
        uploader.source().tracker(),
        uploader.target().tracker(),
    );
    assert!(verbose.contains("confidence 90"));
    assert!(verbose.contains("Upload candidate"));

    assert_eq!(outcome.source_max_size, Some(900_000));
    assert_eq!(outcome.target_max_size, Some(500_000));
    assert!(verbose.contains("Max size: RED 900000 B, OPS 500000 B"));
}

#[tokio::test]
async fn test_missing_release_makes_every_torrent_a_candidate() {
    let Some(source) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(target) = start_mock_server_or_skip().await else {
        return;
    };
    mount_source(&source).await;
    mount(&target, "browse", browse(&[])).await;

    let uploader = uploader(&source, &target);
    let entries = uploader
        .load_entries(&Target::Group {
            tracker: "red".into(),
            group_id: 100,
        })
        .await
        .unwrap();
    let report = uploader.run(&entries).await;

    assert!(report.failures.is_empty());
    assert_eq!(report.candidate_count(), 4);
    let grouped = report.candidates_by_priority();
    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].0, PRIORITY_MISSING_GROUP);

    let text = render_report(&report, uploader.source().tracker());
    assert!(text.contains("[missing group] (4)"));
    assert!(text.contains(&format!("{}/torrents.php?torrentid=1", source.uri())));
}

#[tokio::test]
async fn test_collage_pages_are_followed_and_failures_recorded() {
    let Some(source) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(target) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(query_param("action", "collage"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"pages": 2, "torrentgroups": [{"id": 100, "name": "Album"}]}
        })))
        .mount(&source)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "collage"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"pages": 2, "torrentgroups": [{"name": "No id here"}]}
        })))
        .mount(&source)
        .await;
    mount_source(&source).await;
    mount(&target, "browse", browse(&[])).await;

    let uploader = uploader(&source, &target);
    let entries = uploader
        .load_entries(&Target::Collage {
            tracker: "red".into(),
            collage_id: 8,
            page: 1,
        })
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    let report = uploader.run(&entries).await;
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].group_id, None);
    assert!(report.failures[0].reason.contains("no group id"));
}

#[tokio::test]
async fn test_target_for_other_tracker_rejected() {
    let Some(source) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(target) = start_mock_server_or_skip().await else {
        return;
    };

    let err = uploader(&source, &target)
        .load_entries(&Target::Group {
            tracker: "ops".into(),
            group_id: 1,
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("source tracker is 'red'"));
    assert!(source.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_strict_run_searches_target_with_exact_tier_only() {
    let Some(source) = start_mock_server_or_skip().await else {
        return;
    };
    let Some(target) = start_mock_server_or_skip().await else {
        return;
    };
    mount_source(&source).await;
    Mock::given(method("GET"))
        .and(query_param("action", "browse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(browse(&[])))
        .expect(..=2)
        .mount(&target)
        .await;

    let settings = RunSettings {
        strict: true,
        ..RunSettings::default()
    };
    let uploader = CrossUploader::new(client(&source, "red"), client(&target, "ops"), settings);
    let entries = uploader
        .load_entries(&Target::Group {
            tracker: "red".into(),
            group_id: 100,
        })
        .await
        .unwrap();
    let report = uploader.run(&entries).await;

    assert!(report.failures.is_empty());
    assert_eq!(report.candidate_count(), 4);
    let searches = target.received_requests().await.unwrap().len();
    assert!((1..=2).contains(&searches));
}
