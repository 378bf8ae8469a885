//! Integration tests for health check endpoints
//!
//! Tests the health check API routes to ensure proper responses
//! for liveness and readiness probes.

mod common;

use axum::{body::Body, http::Request, http::StatusCode};
use common::*;
use tower::ServiceExt;

#[tokio::test]
async fn test_root_endpoint() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body_str = String::from_utf8(body.to_vec()).unwrap();
    assert!(body_str.contains("Podqueue"));
}

#[tokio::test]
async fn test_simple_health_check() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "alive");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_probe_with_memory_store() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/health/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    let services = json["services"].as_array().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0]["name"], "state_store");
    assert_eq!(services[0]["details"]["backend"], "memory");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
