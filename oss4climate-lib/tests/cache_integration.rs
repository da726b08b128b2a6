//! Integration tests for the cached fetcher using wiremock

use core::time::Duration;
use oss4climate_lib::fetch::{Cache, FetchError, Fetcher};
use reqwest::header::HeaderMap;
use serde_json::json;
use std::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(cache_dir: &tempfile::TempDir, ignore_cached: bool) -> Fetcher {
    Fetcher::new(Cache::new(cache_dir.path(), ignore_cached), None, 1).expect("Failed to create fetcher")
}

#[tokio::test]
async fn test_cache_hit_issues_no_request() {
    let server = MockServer::start().await;
    let cache_dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/repos/acme/tool"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "tool", "stars": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/repos/acme/tool", server.uri());

    let first = fetcher(&cache_dir, false);
    let value = first.get_json(&url, &HeaderMap::new()).await.unwrap();
    assert_eq!(value["name"], "tool");
    let again = first.get_json(&url, &HeaderMap::new()).await.unwrap();
    assert_eq!(again, value);
    assert_eq!(first.requests_issued(), 1);

    // The cache outlives the fetcher
    let second = fetcher(&cache_dir, false);
    assert_eq!(second.get_json(&url, &HeaderMap::new()).await.unwrap(), value);
    assert_eq!(second.requests_issued(), 0);
}

#[tokio::test]
async fn test_ignore_cached_refetches_and_refreshes() {
    let server = MockServer::start().await;
    let cache_dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/notes.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .expect(2)
        .mount(&server)
        .await;

    let url = format!("{}/notes.txt", server.uri());

    assert_eq!(fetcher(&cache_dir, false).get_text(&url, &HeaderMap::new()).await.unwrap().as_deref(), Some("fresh"));

    let ignoring = fetcher(&cache_dir, true);
    assert_eq!(ignoring.get_text(&url, &HeaderMap::new()).await.unwrap().as_deref(), Some("fresh"));
    assert_eq!(ignoring.requests_issued(), 1);
}

#[tokio::test]
async fn test_missing_text_is_cached_as_absent() {
    let server = MockServer::start().await;
    let cache_dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/acme/tool/main/README.md"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/acme/tool/main/README.md", server.uri());
    let fetcher = fetcher(&cache_dir, false);

    assert_eq!(fetcher.get_text(&url, &HeaderMap::new()).await.unwrap(), None);
    assert_eq!(fetcher.get_text(&url, &HeaderMap::new()).await.unwrap(), None);
    assert_eq!(fetcher.requests_issued(), 1);
}

#[tokio::test]
async fn test_http_errors_are_not_cached() {
    let server = MockServer::start().await;
    let cache_dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/orgs/broken/repos"))
        .respond_with(ResponseTemplate::new(422))
        .expect(2)
        .mount(&server)
        .await;

    let url = format!("{}/orgs/broken/repos", server.uri());
    let fetcher = fetcher(&cache_dir, false);

    for _ in 0..2 {
        let err = fetcher.get_json(&url, &HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Http { status: 422, .. }), "{err}");
    }
    assert_eq!(fetcher.requests_issued(), 2);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    let cache_dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/repos/a/b"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "b" })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/repos/a/b", server.uri());
    let fetcher = fetcher(&cache_dir, false);

    let value = fetcher.get_json(&url, &HeaderMap::new()).await.unwrap();
    assert_eq!(value["name"], "b");
    assert_eq!(fetcher.requests_issued(), 2);
}

#[tokio::test]
async fn test_rate_limited_request_waits_and_retries() {
    let server = MockServer::start().await;
    let cache_dir = tempfile::tempdir().expect("Failed to create temp dir");

    Mock::given(method("GET"))
        .and(path("/repos/a/b"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/a/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "b" })))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/repos/a/b", server.uri());
    let fetcher = fetcher(&cache_dir, false);

    let value = fetcher.get_json(&url, &HeaderMap::new()).await.unwrap();
    assert_eq!(value["name"], "b");
    assert_eq!(fetcher.requests_issued(), 2);
}

#[tokio::test]
async fn test_delay_follows_misses_only() {
    let server = MockServer::start().await;
    let cache_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let delay = Duration::from_millis(300);

    Mock::given(method("GET"))
        .and(path("/notes.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("notes"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/notes.txt", server.uri());
    let fetcher = Fetcher::new(Cache::new(cache_dir.path(), false), Some(delay), 1).expect("Failed to create fetcher");

    let start = Instant::now();
    let _ = fetcher.get_text(&url, &HeaderMap::new()).await.unwrap();
    assert!(start.elapsed() >= delay, "miss took {:?}", start.elapsed());

    let start = Instant::now();
    let _ = fetcher.get_text(&url, &HeaderMap::new()).await.unwrap();
    assert!(start.elapsed() < delay, "hit took {:?}", start.elapsed());
}
