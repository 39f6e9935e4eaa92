//! Webhook ingestion handlers.
//!
//! Both handlers take the body as raw bytes so the exact transmitted bytes
//! reach the signature check. Neither handler returns an error: the
//! pipeline always produces a response. A body the transport refuses to
//! buffer (over the size limit, or cut off) is handed to the pipeline as a
//! fault, so the credential is still checked before anything else.

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use hookgate_core::{BodyEncoding, BodyFault, InboundRequest};
use tracing::{instrument, warn};

use crate::{
    gateway::{self, GatewayEvent, GatewayResponse},
    response::WebhookResponse,
    AppState,
};

/// Header marking a base64 transport-encoded body on the direct route.
pub const TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";

/// Receives a webhook posted directly to the gate.
///
/// A `Content-Transfer-Encoding: base64` header marks the body as base64.
#[instrument(name = "receive_webhook", skip_all)]
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let encoding = body_encoding(&headers);
    let request = match body {
        Ok(body) => InboundRequest::new(headers, body, encoding),
        Err(rejection) => {
            let fault = body_fault(&rejection);
            warn!(?fault, status = %rejection.status(), "Request body not buffered");
            InboundRequest::with_body_fault(headers, encoding, fault)
        },
    };

    state.pipeline.process(&request).await.into_response()
}

/// Receives a webhook wrapped in an API gateway proxy envelope.
///
/// The HTTP status of this call mirrors the envelope's `statusCode`. An
/// envelope that is not valid JSON is answered with a server error
/// envelope, and so is one the transport refuses to buffer: the
/// credential lives inside the envelope, so nothing can be checked.
#[instrument(name = "receive_gateway_event", skip_all)]
pub async fn receive_gateway_event(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let envelope = match body {
        Ok(body) => match serde_json::from_slice::<GatewayEvent>(&body) {
            Ok(event) => gateway::handle_event(&state.pipeline, event).await,
            Err(e) => {
                warn!(error = %e, "Gateway envelope is not valid JSON");
                GatewayResponse::from(WebhookResponse::server_error())
            },
        },
        Err(rejection) => {
            warn!(status = %rejection.status(), "Gateway envelope not buffered");
            GatewayResponse::from(WebhookResponse::server_error())
        },
    };

    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}

fn body_fault(rejection: &BytesRejection) -> BodyFault {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BodyFault::TooLarge
    } else {
        BodyFault::Unreadable
    }
}

fn body_encoding(headers: &HeaderMap) -> BodyEncoding {
    let is_base64 = headers
        .get(TRANSFER_ENCODING_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"));

    BodyEncoding::from_flag(is_base64)
}
