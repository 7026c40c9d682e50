//! HTTP API tests against a real SQLite store

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

use ddas_server::config::Config;
use ddas_server::db::create_pool;
use ddas_server::routes;
use ddas_server::state::AppState;

async fn test_server(dir: &TempDir) -> TestServer {
    let url = format!("sqlite:{}", dir.path().join("api.db").display());
    let pool = create_pool(&url).await.unwrap();
    let state = AppState::new(&Config::default(), pool);
    TestServer::new(routes::app(state)).unwrap()
}

#[tokio::test]
async fn test_health() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;

    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_log_then_log_again_returns_existing_record() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;
    let payload = json!({
        "originalUrl": "https://downloads.example.com/setup.exe",
        "fileName": "setup.exe",
        "etag": "\"abc123\"",
        "contentLength": 2048,
        "downloaderId": "alice"
    });

    let first = server.post("/api/downloads/log").json(&payload).await;
    first.assert_status(StatusCode::CREATED);
    assert_eq!(first.header("x-ddas-outcome"), "persisted");
    let created: Value = first.json();
    assert_eq!(created["fileName"], "setup.exe");
    assert_eq!(created["downloaderId"], "alice");

    let second = server.post("/api/downloads/log").json(&payload).await;
    second.assert_status_ok();
    assert_eq!(second.header("x-ddas-outcome"), "metadata_deduped");
    let existing: Value = second.json();
    assert_eq!(existing["id"], created["id"]);
}

#[tokio::test]
async fn test_log_with_same_hash_under_new_name_is_hash_deduped() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;
    let hash = hex::encode(Sha256::digest(b"report body"));

    server
        .post("/api/downloads/log")
        .json(&json!({ "fileName": "report.pdf", "fileHash": hash }))
        .await
        .assert_status(StatusCode::CREATED);

    let renamed = server
        .post("/api/downloads/log")
        .json(&json!({ "fileName": "report-final.pdf", "fileHash": hash.to_uppercase() }))
        .await;

    renamed.assert_status_ok();
    assert_eq!(renamed.header("x-ddas-outcome"), "hash_deduped");
    let body: Value = renamed.json();
    assert_eq!(body["fileName"], "report.pdf");
}

#[tokio::test]
async fn test_log_rejects_blank_file_name() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;

    let response = server
        .post("/api/downloads/log")
        .json(&json!({ "fileName": "   " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_log_rejects_missing_file_name() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;

    for payload in [
        json!({}),
        json!({ "etag": "x", "contentLength": 5 }),
        json!({ "fileName": null }),
    ] {
        let response = server.post("/api/downloads/log").json(&payload).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_REQUEST");
    }
}

#[tokio::test]
async fn test_quota_survives_overflowing_lengths() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;

    for name in ["disk-a.img", "disk-b.img"] {
        server
            .post("/api/downloads/log")
            .json(&json!({
                "fileName": name,
                "contentLength": i64::MAX / 2 + 10,
                "downloaderId": "gus"
            }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server.get("/api/downloads/quota/gus").await;
    response.assert_status_ok();
    let quota: Value = response.json();
    assert_eq!(quota["usedBytes"], i64::MAX);
    assert_eq!(quota["remainingBytes"], 0);
}

#[tokio::test]
async fn test_check_reports_duplicate_and_feeds_dashboard() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;

    let miss = server
        .post("/api/downloads/check")
        .json(&json!({ "originalUrl": "https://cdn.example.com/movie.mkv" }))
        .await;
    miss.assert_status_ok();
    let miss: Value = miss.json();
    assert_eq!(miss["isDuplicate"], false);
    assert!(miss.get("fileInfo").map_or(true, Value::is_null));

    server
        .post("/api/downloads/log")
        .json(&json!({
            "originalUrl": "https://cdn.example.com/movie.mkv",
            "fileName": "movie.mkv",
            "contentLength": 3072,
            "userId": "bob"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let hit = server
        .post("/api/downloads/check")
        .json(&json!({
            "originalUrl": "https://cdn.example.com/movie.mkv",
            "downloaderId": "carol"
        }))
        .await;
    hit.assert_status_ok();
    let hit: Value = hit.json();
    assert_eq!(hit["isDuplicate"], true);
    assert_eq!(hit["fileInfo"]["fileName"], "movie.mkv");

    let stats: Value = server.get("/api/dashboard/stats").await.json();
    assert_eq!(stats["totalDownloads"], 1);
    assert_eq!(stats["activeUsers"], 1);
    assert_eq!(stats["duplicatesBlocked"], 1);
    assert_eq!(stats["storageSavedBytes"], 3072);
    assert_eq!(stats["storageSaved"], "3.00 KB");
    assert_eq!(stats["recentActivity"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_check_rejects_overlong_url() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;
    let url = format!("https://example.com/{}", "a".repeat(3000));

    let response = server
        .post("/api/downloads/check")
        .json(&json!({ "originalUrl": url }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quota_reflects_logged_bytes() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;

    server
        .post("/api/downloads/log")
        .json(&json!({
            "fileName": "dataset.csv",
            "contentLength": 10_000,
            "downloaderId": "dana"
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let quota: Value = server.get("/api/downloads/quota/dana").await.json();
    assert_eq!(quota["userId"], "dana");
    assert_eq!(quota["usedBytes"], 10_000);
    assert_eq!(
        quota["remainingBytes"].as_i64().unwrap() + 10_000,
        quota["dailyLimitBytes"].as_i64().unwrap()
    );

    let other: Value = server.get("/api/downloads/quota/erin").await.json();
    assert_eq!(other["usedBytes"], 0);
}

#[tokio::test]
async fn test_dashboard_search_and_history() {
    let dir = TempDir::new().unwrap();
    let server = test_server(&dir).await;

    for (name, user) in [("Invoice-2024.pdf", "finance"), ("holiday.jpg", "frank")] {
        server
            .post("/api/downloads/log")
            .json(&json!({ "fileName": name, "downloaderId": user }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let by_name: Value = server
        .get("/api/dashboard/search")
        .add_query_param("query", "invoice")
        .await
        .json();
    let by_name = by_name.as_array().unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0]["fileName"], "Invoice-2024.pdf");

    let by_user: Value = server
        .get("/api/dashboard/search")
        .add_query_param("query", "FRANK")
        .await
        .json();
    assert_eq!(by_user.as_array().unwrap().len(), 1);

    let empty: Value = server
        .get("/api/dashboard/search")
        .add_query_param("query", " ")
        .await
        .json();
    assert!(empty.as_array().unwrap().is_empty());

    let history: Value = server.get("/api/dashboard/history").await.json();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["fileName"], "holiday.jpg");
}
