//! Health check HTTP route handlers
//!
//! - `GET /health` - Simple liveness check (returns 200 OK)
//! - `GET /health/live` - Liveness probe with version
//! - `GET /health/ready` - Readiness check (state store and Spotify credentials)

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::services::HealthService;

/// Create health check router
pub fn health_router(service: HealthService) -> Router {
    Router::new()
        .route("/", get(simple_health))
        .route("/live", get(liveness_probe))
        .route("/ready", get(readiness_probe))
        .with_state(service)
}

/// Always returns OK while the server is responding
async fn simple_health() -> &'static str {
    "OK"
}

/// Liveness probe; does not touch dependencies
async fn liveness_probe() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe
///
/// # Response
/// - 200 OK if every dependency is healthy
/// - 503 Service Unavailable otherwise
async fn readiness_probe(State(service): State<HealthService>) -> impl IntoResponse {
    let response = service.check_all().await;

    let status_code = if response.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health() {
        assert_eq!(simple_health().await, "OK");
    }

    #[tokio::test]
    async fn test_liveness_probe() {
        let response = liveness_probe().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
