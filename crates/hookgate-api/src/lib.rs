//! hookgate HTTP API.
//!
//! Authorization and signature checks, the validation pipeline, and the
//! axum surface that feeds requests into it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod crypto;
pub mod gateway;
pub mod handlers;
pub mod pipeline;
pub mod response;
pub mod server;

pub use config::{Config, StoreBackend};
pub use pipeline::{Pipeline, Stage};
pub use response::{ResponseBody, WebhookResponse};
pub use server::{create_router, start_server, ServerOptions};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Validation pipeline shared across requests.
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Wraps a pipeline for use as router state.
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }
}
