//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response tracing
//! 3. Panic capture (generic 500 body)
//! 4. Route limits: a timeout on health probes, a body size limit on ingest
//! 5. Handler execution
//!
//! Ingest routes carry no transport timeout. An oversized or unreadable body
//! is handed to the pipeline as a body fault so the response still comes from
//! the 200/400/401/500 set, and a started store write is never abandoned.
//! The request timeout bounds the secret load inside the pipeline instead.
//!
//! # Graceful Shutdown
//!
//! The server stops accepting connections on CTRL+C or SIGTERM and lets
//! in-flight requests finish.

use std::{any::Any, net::SocketAddr, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hookgate_core::error::SERVER_ERROR_MESSAGE;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{handlers, AppState};

/// Default timeout for health probes and secret loading.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum accepted body size.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Transport limits applied by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Timeout for health probes and secret loading.
    pub request_timeout: Duration,
    /// Maximum accepted body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { request_timeout: DEFAULT_REQUEST_TIMEOUT, max_body_bytes: DEFAULT_MAX_BODY_BYTES }
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use hookgate_api::{create_router, AppState, Pipeline, ServerOptions};
/// use hookgate_core::{CachedSecrets, EnvSecretProvider, InMemoryEventStore};
///
/// let secrets = Arc::new(CachedSecrets::new(Arc::new(EnvSecretProvider::default())));
/// let pipeline = Pipeline::new(secrets, Arc::new(InMemoryEventStore::new()));
/// let app = create_router(AppState::new(pipeline), ServerOptions::default());
/// ```
pub fn create_router(state: AppState, options: ServerOptions) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            options.request_timeout,
        ));

    let ingest_routes = Router::new()
        .route("/webhooks", post(handlers::receive_webhook))
        .route("/gateway/events", post(handlers::receive_gateway_event))
        .layer(DefaultBodyLimit::max(options.max_body_bytes));

    Router::new()
        .merge(health_routes)
        .merge(ingest_routes)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Converts a handler panic into the generic server error body.
fn panic_response(_panic: Box<dyn Any + Send + 'static>) -> Response {
    error!("Request handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": SERVER_ERROR_MESSAGE })))
        .into_response()
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or serving
/// fails.
pub async fn start_server(
    state: AppState,
    options: ServerOptions,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let app = create_router(state, options);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
