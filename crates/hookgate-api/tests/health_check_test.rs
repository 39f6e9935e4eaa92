//! Integration tests for health, readiness and liveness probes.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use hookgate_api::{create_router, AppState, Pipeline, ServerOptions};
use hookgate_core::CachedSecrets;
use hookgate_testing::{test_secrets, CountingSecretProvider, ScriptedEventStore};
use serde_json::Value;
use tower::ServiceExt;

fn app(secrets: Arc<CachedSecrets>, store: Arc<ScriptedEventStore>) -> Router {
    create_router(AppState::new(Pipeline::new(secrets, store)), ServerOptions::default())
}

async fn get(app: Router, path: &str) -> Result<(StatusCode, Value)> {
    let request = Request::builder().uri(path).body(Body::empty())?;
    let response = app.oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn health_reports_healthy_components() -> Result<()> {
    let (status, body) = get(app(test_secrets(), ScriptedEventStore::new()), "/health").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["event_store"]["status"], "up");
    assert_eq!(body["checks"]["secrets"]["status"], "up");
    Ok(())
}

#[tokio::test]
async fn unreachable_store_is_unhealthy() -> Result<()> {
    let store = ScriptedEventStore::new();
    store.set_unhealthy(true);

    let (status, body) = get(app(test_secrets(), store), "/ready").await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["event_store"]["status"], "down");
    Ok(())
}

#[tokio::test]
async fn missing_secrets_are_unhealthy_without_leaking() -> Result<()> {
    let provider = CountingSecretProvider::failing();

    let (status, body) = get(app(provider.cache(), ScriptedEventStore::new()), "/health").await?;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["secrets"]["status"], "down");
    assert_eq!(body["checks"]["secrets"]["message"], "secret material unavailable");
    Ok(())
}

#[tokio::test]
async fn liveness_ignores_dependencies() -> Result<()> {
    let store = ScriptedEventStore::new();
    store.set_unhealthy(true);

    let (status, body) = get(app(CountingSecretProvider::failing().cache(), store), "/live").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
    Ok(())
}
