//! End-to-end tests for search, suggestions, and track detail.

mod common;

use common::TestServer;
use reqwest::StatusCode;

#[tokio::test]
async fn test_search_matches_all_tokens() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let results: Vec<serde_json::Value> = client
        .get(format!("{}/api/search", server.base_url))
        .query(&[("q", "neon skyline")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["track_uri"], "spotify:track:alpha");
    assert_eq!(results[0]["track_name"], "Neon Skyline");
}

#[tokio::test]
async fn test_search_orders_by_popularity() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // "neon" matches both synthpop tracks; alpha is more popular.
    let results: Vec<serde_json::Value> = client
        .get(format!("{}/api/search", server.base_url))
        .query(&[("q", "neon")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["track_uri"], "spotify:track:alpha");
    assert_eq!(results[1]["track_uri"], "spotify:track:beta");
}

#[tokio::test]
async fn test_short_query_returns_empty() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let results: Vec<serde_json::Value> = client
        .get(format!("{}/api/search", server.base_url))
        .query(&[("q", "n")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_suggest_returns_compact_shape() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let results: Vec<serde_json::Value> = client
        .get(format!("{}/api/suggest", server.base_url))
        .query(&[("q", "dust")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for item in &results {
        assert!(item.get("track_uri").is_some());
        assert!(item.get("track_name").is_some());
        // Suggestions stay compact: no feature columns.
        assert!(item.get("danceability").is_none());
    }
}

#[tokio::test]
async fn test_song_detail_roundtrip_and_404() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "{}/api/song/spotify:track:gamma",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let detail: serde_json::Value = response.json().await.unwrap();
    assert_eq!(detail["track_name"], "Dust Roads");
    assert_eq!(detail["release_year"], 1972);
    assert_eq!(detail["explicit"], false);

    let response = client
        .get(format!("{}/api/song/spotify:track:missing", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_catalog_size() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let health: serde_json::Value = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["tracks"], 6);
}
