//! Health check handlers for service monitoring.
//!
//! Provides liveness, readiness, and health endpoints. Health covers the
//! event store and the availability of secret material; liveness checks
//! nothing beyond the process answering.

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use hookgate_core::{CachedSecrets, EventStore};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::AppState;

/// Health check response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service health status
    pub status: HealthStatus,
    /// Timestamp when health check was performed
    pub timestamp: DateTime<Utc>,
    /// Individual component health checks
    pub checks: HealthChecks,
    /// Service version information
    pub version: String,
}

/// Overall health status enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Critical systems failing
    Unhealthy,
}

/// Individual component health check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Event store connectivity
    pub event_store: ComponentHealth,
    /// Secret material availability
    pub secrets: ComponentHealth,
}

/// Health status for individual components.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// Component status
    pub status: ComponentStatus,
    /// Optional error message if unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

/// Component-level health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is healthy
    Up,
    /// Component is experiencing issues
    Down,
}

/// Runs the component checks and assembles the response.
pub async fn check_health(store: &dyn EventStore, secrets: &CachedSecrets) -> HealthResponse {
    debug!("Performing health check");

    let event_store = check_event_store(store).await;
    let secrets = check_secrets(secrets).await;

    let status = if event_store.status == ComponentStatus::Up && secrets.status == ComponentStatus::Up
    {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    HealthResponse {
        status,
        timestamp: Utc::now(),
        checks: HealthChecks { event_store, secrets },
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

async fn check_event_store(store: &dyn EventStore) -> ComponentHealth {
    let start = Instant::now();
    let result = store.health_check().await;
    let response_time_ms = elapsed_ms(start);

    match result {
        Ok(()) => ComponentHealth { status: ComponentStatus::Up, message: None, response_time_ms },
        Err(e) => {
            error!("Event store health check failed: {}", e);
            ComponentHealth {
                status: ComponentStatus::Down,
                message: Some("event store unreachable".to_string()),
                response_time_ms,
            }
        },
    }
}

async fn check_secrets(secrets: &CachedSecrets) -> ComponentHealth {
    let start = Instant::now();
    let result = secrets.get().await;
    let response_time_ms = elapsed_ms(start);

    match result {
        Ok(_) => ComponentHealth { status: ComponentStatus::Up, message: None, response_time_ms },
        Err(e) => {
            error!("Secret material unavailable: {}", e);
            ComponentHealth {
                status: ComponentStatus::Down,
                message: Some("secret material unavailable".to_string()),
                response_time_ms,
            }
        },
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Health check endpoint handler.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let response = check_health(state.pipeline.store().as_ref(), state.pipeline.secrets()).await;

    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    debug!(
        status = ?response.status,
        event_store = ?response.checks.event_store.status,
        secrets = ?response.checks.secrets.status,
        "Health check completed"
    );

    (status_code, Json(response)).into_response()
}

/// Readiness check endpoint for orchestrator probes.
///
/// Shares the health check: the gate is ready once it can reach its store
/// and load its secrets.
#[instrument(name = "readiness_check", skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    health_check(State(state)).await
}

/// Liveness check endpoint.
///
/// Does not touch external dependencies.
#[instrument(name = "liveness_check", skip_all)]
pub async fn liveness_check() -> Response {
    let response = serde_json::json!({
        "status": "alive",
        "timestamp": Utc::now(),
        "service": "hookgate"
    });

    (StatusCode::OK, Json(response)).into_response()
}
