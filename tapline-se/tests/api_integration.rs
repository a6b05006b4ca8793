//! HTTP API integration tests
//!
//! Exercises the router end to end with in-memory services: scan injection,
//! the attendance re-query surface, notices, and the SSE endpoint contract.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tower::ServiceExt;

use tapline_common::SystemClock;
use tapline_se::api::{create_router, AppContext};
use tapline_se::config::ScanTuning;
use tapline_se::db;
use tapline_se::ingest::ScanEngine;

fn test_tuning() -> ScanTuning {
    ScanTuning {
        min_identifier_len: 4,
        identifier_frame_width: 10,
        keystroke_gap: Duration::from_millis(40),
        dedup_window: Duration::from_millis(150),
        roster_wait_timeout: Duration::from_millis(300),
        roster_poll_interval: Duration::from_millis(20),
        roster_refresh_interval: Duration::from_secs(60),
        notice_success_ttl: Duration::from_millis(3000),
        notice_failure_ttl: Duration::from_millis(5000),
    }
}

async fn setup() -> (axum::Router, Arc<ScanEngine>, Pool<Sqlite>) {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init::init_schema(&pool).await.unwrap();

    sqlx::query(
        "INSERT INTO students (person_id, display_name, site_id, card_identifier, secondary_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind("stu-1")
    .bind("Mia Park")
    .bind("site-a")
    .bind("3680715012")
    .bind("S2201")
    .execute(&pool)
    .await
    .unwrap();

    db::devices::register_device(&pool, "front-desk-1", "site-a", "Front Desk")
        .await
        .unwrap();

    let engine = ScanEngine::new(pool.clone(), test_tuning(), Arc::new(SystemClock))
        .await
        .unwrap();

    let router = create_router(AppContext {
        engine: engine.clone(),
        db_pool: pool.clone(),
    });

    (router, engine, pool)
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_json(router: &axum::Router, uri: &str, body: serde_json::Value) -> StatusCode {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (router, engine, _pool) = setup().await;

    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["module"], "scan_engine");

    engine.shutdown().await;
}

#[tokio::test]
async fn test_nfc_scan_roundtrip_via_http() {
    let (router, engine, _pool) = setup().await;

    let status = post_json(
        &router,
        "/scan/nfc",
        serde_json::json!({
            "site_id": "site-a",
            "device_id": "front-desk-1",
            "uid": "3680715012"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // The pipeline runs asynchronously behind the 202
    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, body) = get(&router, "/attendance/recent?site_id=site-a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["facts"][0]["person_id"], "stu-1");
    assert_eq!(body["facts"][0]["device_label"], "Front Desk");
    assert_eq!(body["facts"][0]["status"], "present");

    let (status, body) = get(&router, "/notices?site_id=site-a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notices"][0]["severity"], "success");
    assert_eq!(body["notices"][0]["text"], "Mia Park is present");

    engine.shutdown().await;
}

#[tokio::test]
async fn test_key_scan_roundtrip_via_http() {
    let (router, engine, _pool) = setup().await;

    for key in "0003680715012".chars().map(|c| c.to_string()).chain(["Enter".to_string()]) {
        let status = post_json(
            &router,
            "/scan/key",
            serde_json::json!({
                "site_id": "site-a",
                "device_id": "front-desk-1",
                "key": key
            }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    tokio::time::sleep(Duration::from_millis(300)).await;

    let (status, body) = get(&router, "/attendance/recent?site_id=site-a").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["facts"][0]["person_type"], "student");

    engine.shutdown().await;
}

#[tokio::test]
async fn test_recent_attendance_scoped_by_site() {
    let (router, engine, _pool) = setup().await;

    let (status, body) = get(&router, "/attendance/recent?site_id=site-other").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_tuning_endpoint_reflects_effective_values() {
    let (router, engine, _pool) = setup().await;

    let (status, body) = get(&router, "/scan/tuning").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["min_identifier_len"], 4);
    assert_eq!(body["identifier_frame_width"], 10);
    assert_eq!(body["keystroke_gap_ms"], 40);
    assert_eq!(body["dedup_window_ms"], 150);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_events_endpoint_is_an_sse_stream() {
    let (router, engine, _pool) = setup().await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/events?site_id=site-a")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));

    engine.shutdown().await;
}
