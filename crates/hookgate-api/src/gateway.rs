//! API gateway proxy envelopes.
//!
//! Some deployments sit behind a gateway that wraps the original HTTP call
//! in a JSON envelope (`headers`, `body`, `isBase64Encoded`) and expects a
//! JSON envelope back (`statusCode`, `headers`, `body`). These types adapt
//! that shape to [`InboundRequest`] and [`WebhookResponse`].

use std::collections::HashMap;

use hookgate_core::{BodyEncoding, InboundRequest};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{pipeline::Pipeline, response::WebhookResponse};

/// Incoming proxy envelope.
///
/// Unknown fields are ignored. Header values may be `null`, which is treated
/// as the header being absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    /// Header map as forwarded by the gateway.
    #[serde(default)]
    pub headers: Option<HashMap<String, Option<String>>>,
    /// Body as a string, possibly base64.
    #[serde(default)]
    pub body: Option<String>,
    /// Whether `body` is base64 encoded.
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl GatewayEvent {
    /// Converts the envelope into the transport-neutral request.
    pub fn into_request(self) -> InboundRequest {
        let headers = self
            .headers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)));

        InboundRequest::from_pairs(
            headers,
            self.body.unwrap_or_default(),
            BodyEncoding::from_flag(self.is_base64_encoded),
        )
    }
}

/// Outgoing proxy envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// JSON body serialized to a string.
    pub body: String,
}

impl From<WebhookResponse> for GatewayResponse {
    fn from(response: WebhookResponse) -> Self {
        let headers = HashMap::from([("content-type".to_string(), "application/json".to_string())]);

        Self { status_code: response.status().as_u16(), headers, body: response.body_json() }
    }
}

/// Runs a proxy envelope through the pipeline.
#[instrument(name = "gateway_event", skip_all, fields(is_base64_encoded = event.is_base64_encoded))]
pub async fn handle_event(pipeline: &Pipeline, event: GatewayEvent) -> GatewayResponse {
    let request = event.into_request();
    pipeline.process(&request).await.into()
}
