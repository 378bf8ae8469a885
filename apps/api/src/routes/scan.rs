//! Scan trigger and status routes
//!
//! - `POST /scan` - Start a background scan (202, 409 while running, 400 without a playlist)
//! - `GET /scan/status` - Poll the progress of the current or last scan
//! - `GET /scan/state` - Stored curation state

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::models::{ProgressStatus, ScanStateView};
use crate::state::AppState;

/// Create scan router
pub fn scan_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(start_scan))
        .route("/status", get(scan_status))
        .route("/state", get(scan_state))
        .with_state(state)
}

async fn start_scan(State(state): State<AppState>, auth: AuthUser) -> ApiResult<impl IntoResponse> {
    state
        .scans
        .start(&auth.user_id, &auth.access_token)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "started" }))))
}

/// Current progress; a finished scan is reported once, then `idle`
async fn scan_status(State(state): State<AppState>, auth: AuthUser) -> Json<ProgressStatus> {
    let stage = state.scans.progress().poll(&auth.user_id);
    Json(ProgressStatus::from(&stage))
}

async fn scan_state(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ScanStateView>> {
    let stored = state.scans.store().load(&auth.user_id).await?;
    Ok(Json(ScanStateView::from(&stored)))
}
