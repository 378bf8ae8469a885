//! Integration tests for the HTTP surface
//!
//! Requests go through the assembled router with `oneshot`; Spotify is a
//! wiremock server.

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use common::*;
use podqueue_api::models::ScanStage;
use podqueue_api::repositories::ScanStateStore;
use podqueue_test_utils::{EpisodeFixture, ShowFixture};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn test_missing_session_asks_for_reauthentication() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(request("GET", "/scan/status", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["details"]["reauthenticate_url"], "/auth/login");
}

#[tokio::test]
async fn test_invalid_session_token_rejected() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(request("GET", "/scan/state", Some("not-a-jwt"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_status_is_idle_without_scan() {
    let app = TestApp::start().await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request("GET", "/scan/status", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stage"], "idle");
    assert_eq!(body["is_done"], false);
    assert_eq!(body["is_error"], false);
}

#[tokio::test]
async fn test_scan_without_playlist_is_bad_request() {
    let app = TestApp::start().await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request("POST", "/scan", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "MISSING_PLAYLIST");
}

#[tokio::test]
async fn test_scan_while_running_conflicts() {
    let app = TestApp::start().await;
    app.with_target_playlist().await;
    let token = app.session_token(TEST_USER);
    let _running = app.scans().progress().begin(TEST_USER).unwrap();

    let response = app
        .router()
        .oneshot(request("POST", "/scan", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "SCAN_ALREADY_RUNNING");
}

#[tokio::test]
async fn test_scan_accepted_and_state_updated() {
    let app = TestApp::start().await;
    app.with_target_playlist().await;
    app.spotify
        .mock_saved_shows(vec![ShowFixture::new("s1", "History Hour")])
        .await;
    app.spotify
        .mock_show_episodes("s1", vec![EpisodeFixture::new("a", "2020-01-01", 300)])
        .await;
    app.spotify.mock_replace_items(TEST_PLAYLIST).await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request("POST", "/scan", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["status"], "started");

    app.wait_for_outcome(TEST_USER).await;

    let response = app
        .router()
        .oneshot(request("GET", "/scan/state", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["playlist_id"], TEST_PLAYLIST);
    assert_eq!(body["band_pointer"], 5);
    assert_eq!(body["queued_count"], 1);
    assert_eq!(body["last_scan"]["total_count"], 1);
}

#[tokio::test]
async fn test_set_playlist_from_share_url() {
    let app = TestApp::start().await;
    app.spotify.mock_playlist("abc123", TEST_USER, false).await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request(
            "PUT",
            "/playlist",
            Some(&token),
            Some(json!({ "playlist": "https://open.spotify.com/playlist/abc123?si=xyz" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["playlist_id"], "abc123");

    let state = app.store.load(TEST_USER).await.unwrap();
    assert_eq!(state.playlist_id.as_deref(), Some("abc123"));
    assert_eq!(state.band_pointer, None);
}

#[tokio::test]
async fn test_set_playlist_rejects_garbage() {
    let app = TestApp::start().await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request(
            "PUT",
            "/playlist",
            Some(&token),
            Some(json!({ "playlist": "my favourite episodes" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_PLAYLIST_REFERENCE");
}

#[tokio::test]
async fn test_set_playlist_rejects_foreign_and_missing() {
    let app = TestApp::start().await;
    app.spotify.mock_playlist("theirs", "bob", false).await;
    app.spotify.mock_playlist_not_found("gone").await;
    let token = app.session_token(TEST_USER);

    for reference in ["spotify:playlist:theirs", "gone"] {
        let response = app
            .router()
            .oneshot(request(
                "PUT",
                "/playlist",
                Some(&token),
                Some(json!({ "playlist": reference })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", reference);
        assert_eq!(body_json(response).await["code"], "INVALID_PLAYLIST_REFERENCE");
    }

    assert_eq!(app.store.load(TEST_USER).await.unwrap().playlist_id, None);
}

#[tokio::test]
async fn test_collaborative_playlist_accepted() {
    let app = TestApp::start().await;
    app.spotify.mock_playlist("shared", "bob", true).await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request(
            "PUT",
            "/playlist",
            Some(&token),
            Some(json!({ "playlist": "shared" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_set_playlist_while_running_conflicts() {
    let app = TestApp::start().await;
    let token = app.session_token(TEST_USER);
    let _running = app.scans().progress().begin(TEST_USER).unwrap();

    let response = app
        .router()
        .oneshot(request(
            "PUT",
            "/playlist",
            Some(&token),
            Some(json!({ "playlist": "abc123" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_scan_cannot_start_while_playlist_changes() {
    let app = TestApp::start().await;
    app.with_target_playlist().await;
    app.spotify
        .mock_slow_playlist("abc123", TEST_USER, Duration::from_millis(500))
        .await;
    let token = app.session_token(TEST_USER);

    let setup = tokio::spawn(app.router().oneshot(request(
        "PUT",
        "/playlist",
        Some(&token),
        Some(json!({ "playlist": "abc123" })),
    )));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = app
        .router()
        .oneshot(request("POST", "/scan", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = setup.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.scans().progress().poll(TEST_USER), ScanStage::Idle);
}

#[tokio::test]
async fn test_rejected_playlist_change_releases_scan_slot() {
    let app = TestApp::start().await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request(
            "PUT",
            "/playlist",
            Some(&token),
            Some(json!({ "playlist": "not a playlist" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.scans().progress().poll(TEST_USER), ScanStage::Idle);
    assert!(app.scans().progress().begin(TEST_USER).is_ok());
}

#[tokio::test]
async fn test_create_playlist_starts_scan() {
    let app = TestApp::start().await;
    app.spotify.mock_create_playlist(TEST_USER, "fresh1").await;
    app.spotify.mock_saved_shows(vec![]).await;
    app.spotify.mock_replace_items("fresh1").await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request("POST", "/playlist", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["playlist_id"], "fresh1");

    app.wait_for_outcome(TEST_USER).await;
    let state = app.store.load(TEST_USER).await.unwrap();
    assert_eq!(state.playlist_id.as_deref(), Some("fresh1"));
    assert!(state.last_scan.is_some());
}

#[tokio::test]
async fn test_login_redirects_to_consent_screen() {
    let app = TestApp::start().await;

    let response = app
        .router()
        .oneshot(request("GET", "/auth/login", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with(&format!("{}/authorize?", app.spotify.url())));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn test_callback_opens_session() {
    let app = TestApp::start().await;
    app.spotify.mock_token_exchange("fresh-token").await;
    app.spotify.mock_current_user(TEST_USER).await;
    let state = app.state.sessions.issue_state().unwrap();

    let response = app
        .router()
        .oneshot(request(
            "GET",
            &format!("/auth/callback?code=auth-code&state={}", state),
            None,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("podqueue_session="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(response).await;
    assert_eq!(body["user_id"], TEST_USER);
    assert_eq!(body["expires_in"], 3600);

    let claims = app
        .state
        .sessions
        .verify_session(body["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.sub, TEST_USER);
    assert_eq!(claims.spotify_token, "fresh-token");
}

#[tokio::test]
async fn test_callback_rejects_bad_state_and_denial() {
    let app = TestApp::start().await;

    for uri in [
        "/auth/callback?code=auth-code&state=forged",
        "/auth/callback?code=auth-code",
        "/auth/callback?error=access_denied",
    ] {
        let response = app
            .router()
            .oneshot(request("GET", uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_callback_with_rejected_code() {
    let app = TestApp::start().await;
    app.spotify.mock_token_exchange_failure().await;
    let state = app.state.sessions.issue_state().unwrap();

    let response = app
        .router()
        .oneshot(request(
            "GET",
            &format!("/auth/callback?code=stale&state={}", state),
            None,
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_logout_expires_session_cookie() {
    let app = TestApp::start().await;
    let token = app.session_token(TEST_USER);

    let response = app
        .router()
        .oneshot(request("POST", "/auth/logout", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("podqueue_session=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("HttpOnly"));
}
