//! HTTP request handlers for the gate.
//!
//! - `webhook` - direct and gateway-envelope ingestion
//! - `health` - health, readiness and liveness probes

pub mod health;
pub mod webhook;

pub use health::{health_check, liveness_check, readiness_check};
pub use webhook::{receive_gateway_event, receive_webhook};
