//! Health checks for the service's dependencies
//!
//! Readiness covers:
//! - The scan state store (PostgreSQL or in-memory)
//! - Spotify application credentials

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::repositories::ScanStateStore;

/// Status of an individual dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
}

/// Result of a single dependency check
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    /// Name of the dependency
    pub name: &'static str,
    pub status: ServiceStatus,
    /// Response time in milliseconds (if measured)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    /// Error message if unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ServiceHealth {
    /// Create a healthy result
    pub fn healthy(name: &'static str, response_time: Option<Duration>) -> Self {
        Self {
            name,
            status: ServiceStatus::Healthy,
            response_time_ms: response_time.map(|t| t.as_millis() as u64),
            error: None,
            details: None,
        }
    }

    /// Create an unhealthy result
    pub fn unhealthy(name: &'static str, error: impl Into<String>) -> Self {
        Self {
            name,
            status: ServiceStatus::Unhealthy,
            response_time_ms: None,
            error: Some(error.into()),
            details: None,
        }
    }

    /// Attach details to the result
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Aggregated readiness response
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResponse {
    /// Healthy only if every dependency is healthy
    pub status: ServiceStatus,
    pub services: Vec<ServiceHealth>,
    /// Total time to complete all checks
    pub total_time_ms: u64,
    /// API version
    pub version: &'static str,
}

impl HealthCheckResponse {
    /// Create a response from individual results
    pub fn new(services: Vec<ServiceHealth>, total_time: Duration) -> Self {
        let status = if services.iter().all(|s| s.status == ServiceStatus::Healthy) {
            ServiceStatus::Healthy
        } else {
            ServiceStatus::Unhealthy
        };

        Self {
            status,
            services,
            total_time_ms: total_time.as_millis() as u64,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Check if overall health is good
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

/// Health check service
#[derive(Clone)]
pub struct HealthService {
    store: Arc<dyn ScanStateStore>,
    backend: &'static str,
    spotify_configured: bool,
}

impl HealthService {
    /// Create a health service for a store and credential state
    pub fn new(store: Arc<dyn ScanStateStore>, backend: &'static str, spotify_configured: bool) -> Self {
        Self {
            store,
            backend,
            spotify_configured,
        }
    }

    /// Check that scan state can be read and written
    pub async fn check_store(&self) -> ServiceHealth {
        let start = Instant::now();
        match self.store.health_check().await {
            Ok(()) => ServiceHealth::healthy("state_store", Some(start.elapsed()))
                .with_details(serde_json::json!({ "backend": self.backend })),
            Err(e) => ServiceHealth::unhealthy("state_store", format!("Query failed: {}", e)),
        }
    }

    /// Check that the Spotify application is configured
    pub fn check_spotify(&self) -> ServiceHealth {
        if self.spotify_configured {
            ServiceHealth::healthy("spotify", None)
        } else {
            ServiceHealth::unhealthy("spotify", "SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET are not set")
        }
    }

    /// Run all checks
    pub async fn check_all(&self) -> HealthCheckResponse {
        let start = Instant::now();
        let services = vec![self.check_store().await, self.check_spotify()];
        HealthCheckResponse::new(services, start.elapsed())
    }
}
