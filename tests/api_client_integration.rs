//! Integration tests for the tracker API client against mock servers.

mod support;
use support::socket_guard::start_mock_server_or_skip;

use std::sync::Arc;
use std::time::Duration;

use crossupload_core::api::{ApiError, BrowseParams, ClientOptions, RetryPolicy, ServerPacer, TrackerClient};
use crossupload_core::tracker::TrackerConfig;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_options() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_secs(5),
        max_concurrency: 2,
        min_interval: Duration::ZERO,
        retry_policy: RetryPolicy::new(3, Duration::from_millis(10)),
        ..ClientOptions::default()
    }
}

fn client(server: &MockServer, name: &str) -> TrackerClient {
    let tracker = TrackerConfig::new(name, server.uri(), "secret-key");
    TrackerClient::with_pacer(tracker, fast_options(), Arc::new(ServerPacer::new())).unwrap()
}

#[tokio::test]
async fn test_search_parses_browse_results() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/ajax.php"))
        .and(query_param("action", "browse"))
        .and(query_param("artistname", "Boards of Canada"))
        .and(header("authorization", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"results": [
                {"groupId": 7, "groupName": "Geogaddi", "artist": "Boards of Canada", "groupYear": 2002},
                {"groupId": "8", "groupName": "Twoism", "artist": "Boards of Canada"}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client(&server, "red")
        .search(&BrowseParams {
            artistname: Some("Boards of Canada".into()),
            ..BrowseParams::default()
        })
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].group_id, 7);
    assert_eq!(hits[0].group_year, Some(2002));
    assert_eq!(hits[1].group_id, 8);
    assert_eq!(hits[1].group_name, "Twoism");
}

#[tokio::test]
async fn test_ops_sends_token_prefixed_key() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/ajax.php"))
        .and(header("authorization", "token secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"group": {"id": 3}, "torrents": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, "ops").get_group(3).await.unwrap();
    assert!(response.contains_key("group"));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, "red").get_group(1).await.unwrap_err();
    assert!(matches!(err, ApiError::Protocol { status: Some(404), .. }));
}

#[tokio::test]
async fn test_transient_status_retried_then_succeeds() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"results": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hits = client(&server, "red")
        .search(&BrowseParams::default())
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_persistent_throttle_exhausts_retries() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server, "red").get_group(1).await.unwrap_err();
    match err {
        ApiError::RetriesExhausted { attempts, last, .. } => {
            assert_eq!(attempts, 3);
            assert!(matches!(*last, ApiError::Throttle { status: Some(429), .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failure_envelope_is_retried_as_throttle() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "failure"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"group": {"id": 5}, "torrents": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, "red").get_group(5).await.unwrap();
    assert_eq!(response["group"]["id"], 5);
}

#[tokio::test]
async fn test_non_json_body_is_protocol_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, "red").get_group(1).await.unwrap_err();
    assert!(matches!(err, ApiError::Protocol { .. }));
    assert!(err.to_string().contains("not JSON"));
}

#[tokio::test]
async fn test_malformed_results_is_protocol_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"results": "nope"}
        })))
        .mount(&server)
        .await;

    let err = client(&server, "red")
        .search(&BrowseParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Protocol { .. }));
}

#[tokio::test]
async fn test_clients_sharing_pacer_share_server_state() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "response": {"results": []}
        })))
        .mount(&server)
        .await;

    let pacer = Arc::new(ServerPacer::new());
    let with_slash = TrackerConfig::new("red", format!("{}/", server.uri()), "k");
    let without_slash = TrackerConfig::new("red", server.uri(), "k");
    let a = TrackerClient::with_pacer(with_slash, fast_options(), Arc::clone(&pacer)).unwrap();
    let b = TrackerClient::with_pacer(without_slash, fast_options(), Arc::clone(&pacer)).unwrap();

    a.search(&BrowseParams::default()).await.unwrap();
    b.search(&BrowseParams::default()).await.unwrap();
    assert_eq!(pacer.server_count(), 1);
}

#[tokio::test]
async fn test_profile_actions_send_expected_params() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let ok = ResponseTemplate::new(200).set_body_json(json!({"status": "success", "response": {}}));
    Mock::given(method("GET"))
        .and(query_param("action", "index"))
        .respond_with(ok.clone())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "torrent"))
        .and(query_param("id", "31"))
        .respond_with(ok.clone())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("action", "user_torrents"))
        .and(query_param("type", "seeding"))
        .and(query_param("id", "4"))
        .and(query_param("limit", "500"))
        .and(query_param("offset", "0"))
        .respond_with(ok)
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, "red");
    client.get_index().await.unwrap();
    client.get_torrent(31).await.unwrap();
    client.get_user_torrents("seeding", 4, 500, 0).await.unwrap();
}

#[tokio::test]
async fn test_permanent_error_on_last_attempt_is_not_wrapped() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, "red").get_group(1).await.unwrap_err();
    assert!(matches!(err, ApiError::Protocol { status: Some(404), .. }));
}
