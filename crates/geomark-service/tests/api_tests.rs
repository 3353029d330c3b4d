//! Integration tests for the query service endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use geomark_db::{MarkerIndex, MarkerStore};
use geomark_service::router::build_router;
use geomark_service::state::AppState;
use geomark_types::SequentialIdSource;
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_test_state(query_limit: usize) -> Arc<AppState> {
    let store = MarkerStore::new(
        MarkerIndex::memory(),
        Arc::new(SequentialIdSource::new("cat")),
    )
    .with_query_limit(query_limit);
    Arc::new(AppState::new(store))
}

fn put_request(body: &Value) -> Request<Body> {
    Request::post("/put")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn list_request(rect: &str) -> Request<Body> {
    let encoded: String = rect
        .chars()
        .map(|c| match c {
            '[' => String::from("%5B"),
            ']' => String::from("%5D"),
            ',' => String::from("%2C"),
            ' ' => String::from("%20"),
            other => other.to_string(),
        })
        .collect();
    Request::get(format!("/list?rect={encoded}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_text(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_put_assigns_id() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(put_request(&json!({"coordinates": [1, 2], "name": "X"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let stored = &json[0];
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(stored["id"], "cat-1");
    assert_eq!(stored["coordinates"], json!([1.0, 2.0]));
    assert_eq!(stored["name"], "X");
}

#[tokio::test]
async fn test_put_then_list_round_trip() {
    let state = make_test_state(1000);

    let marker = json!({"id": "barsik", "coordinates": [299.1, 148.9], "name": "Барсик"});
    let response = build_router(Arc::clone(&state))
        .oneshot(put_request(&marker))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = build_router(state)
        .oneshot(list_request("[299.0, 148.8, 299.2, 149.0]"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, json!([marker]));
}

#[tokio::test]
async fn test_put_same_id_replaces() {
    let state = make_test_state(1000);

    for (x, name) in [(1.0, "first"), (2.0, "second")] {
        let response = build_router(Arc::clone(&state))
            .oneshot(put_request(&json!({"id": "m", "coordinates": [x, 0], "name": name})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = build_router(state)
        .oneshot(list_request("[0, -1, 10, 1]"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(json[0]["name"], "second");
}

#[tokio::test]
async fn test_list_empty_store() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(list_request("[0,0,10,10]"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await, json!([]));
}

#[tokio::test]
async fn test_list_malformed_rect() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(list_request("[0,0,10]"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_to_text(response.into_body()).await;
    assert!(text.starts_with("bad request: invalid rect"), "unexpected body: {text}");
}

#[tokio::test]
async fn test_list_missing_rect() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(Request::get("/list").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_to_text(response.into_body()).await;
    assert!(text.contains("missing rect"), "unexpected body: {text}");
}

#[tokio::test]
async fn test_list_duplicate_rect() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(
            Request::get("/list?rect=%5B0%2C0%2C1%2C1%5D&rect=%5B0%2C0%2C2%2C2%5D")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_to_text(response.into_body()).await;
    assert!(text.starts_with("bad request"), "unexpected body: {text}");
    assert!(text.contains("more than once"), "unexpected body: {text}");
}

#[tokio::test]
async fn test_list_ignores_unrelated_params() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(
            Request::get("/list?page=2&rect=%5B0%2C0%2C1%2C1%5D")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await, json!([]));
}

#[tokio::test]
async fn test_list_respects_query_limit() {
    let state = make_test_state(3);

    for i in 0..10 {
        let response = build_router(Arc::clone(&state))
            .oneshot(put_request(&json!({"coordinates": [i, i], "name": "n"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = build_router(state)
        .oneshot(list_request("[0,0,100,100]"))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json.as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_put_malformed_payload() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(
            Request::post("/put")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_to_text(response.into_body()).await;
    assert!(text.starts_with("bad request"), "unexpected body: {text}");
}

#[tokio::test]
async fn test_put_three_coordinates_rejected() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(put_request(&json!({"coordinates": [1, 2, 3], "name": "X"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_put_empty_name_is_storage_error() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(put_request(&json!({"coordinates": [1, 2], "name": ""})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let text = body_to_text(response.into_body()).await;
    assert!(text.starts_with("storage error"), "unexpected body: {text}");
}

#[tokio::test]
async fn test_reset_clears_store() {
    let state = make_test_state(1000);

    build_router(Arc::clone(&state))
        .oneshot(put_request(&json!({"coordinates": [1, 1], "name": "n"})))
        .await
        .unwrap();

    for _ in 0..2 {
        let response = build_router(Arc::clone(&state))
            .oneshot(Request::post("/reset").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = build_router(state)
        .oneshot(list_request("[0,0,10,10]"))
        .await
        .unwrap();
    assert_eq!(body_to_json(response.into_body()).await, json!([]));
}

#[tokio::test]
async fn test_health_reports_count() {
    let state = make_test_state(1000);

    build_router(Arc::clone(&state))
        .oneshot(put_request(&json!({"coordinates": [1, 1], "name": "n"})))
        .await
        .unwrap();

    let response = build_router(state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["backend"], "memory");
    assert_eq!(json["markers"], 1);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let router = build_router(make_test_state(1000));

    let response = router
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
