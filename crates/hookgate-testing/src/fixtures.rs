//! Signed webhook request builders.
//!
//! Produces the same request in the three shapes the gate accepts: an
//! [`InboundRequest`] for driving the pipeline directly, an HTTP request for
//! `POST /webhooks`, and a JSON envelope for `POST /gateway/events`.

use axum::body::Body;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use hmac::{Hmac, Mac};
use hookgate_core::{BodyEncoding, InboundRequest};
use serde_json::{json, Map, Value};
use sha2::Sha256;

/// Authorization token used throughout the test suites.
pub const TEST_AUTH_TOKEN: &str = "test-webhook-token";

/// Signing key used throughout the test suites.
pub const TEST_SIGNING_KEY: &str = "test-signing-key";

/// Default event body, as in a provider `payment_approved` notification.
pub const DEFAULT_BODY: &str = r#"{"id":"evt_1","type":"payment_approved"}"#;

/// Hex HMAC-SHA256 of `body` under `key`.
///
/// Computed independently of the gate so tests do not trust the code
/// under test to sign its own inputs.
pub fn sign_body(body: &[u8], key: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[derive(Debug, Clone)]
enum Header {
    Computed,
    Explicit(String),
    Omitted,
}

/// Builder for signed webhook requests.
///
/// Defaults to a correctly authorized and signed [`DEFAULT_BODY`]. Each
/// setter breaks one thing at a time.
#[derive(Debug, Clone)]
pub struct WebhookRequestBuilder {
    body: Vec<u8>,
    credential: Option<String>,
    signature: Header,
    signing_key: String,
    base64: bool,
    extra_headers: Vec<(String, String)>,
}

impl Default for WebhookRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookRequestBuilder {
    /// Creates a builder for a valid request.
    pub fn new() -> Self {
        Self {
            body: DEFAULT_BODY.as_bytes().to_vec(),
            credential: Some(TEST_AUTH_TOKEN.to_string()),
            signature: Header::Computed,
            signing_key: TEST_SIGNING_KEY.to_string(),
            base64: false,
            extra_headers: Vec::new(),
        }
    }

    /// Sets the raw body. The signature is computed over these bytes.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serializes `payload` as the body.
    #[must_use]
    pub fn json_body(self, payload: &Value) -> Self {
        self.body(payload.to_string())
    }

    /// Sets the credential header value.
    #[must_use]
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Omits the credential header.
    #[must_use]
    pub fn without_credential(mut self) -> Self {
        self.credential = None;
        self
    }

    /// Sends `signature` verbatim instead of the computed one.
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Header::Explicit(signature.into());
        self
    }

    /// Omits the signature header.
    #[must_use]
    pub fn without_signature(mut self) -> Self {
        self.signature = Header::Omitted;
        self
    }

    /// Signs with `key` instead of [`TEST_SIGNING_KEY`].
    #[must_use]
    pub fn signing_key(mut self, key: impl Into<String>) -> Self {
        self.signing_key = key.into();
        self
    }

    /// Transmits the body base64 encoded. The signature still covers the
    /// decoded bytes.
    #[must_use]
    pub fn base64(mut self) -> Self {
        self.base64 = true;
        self
    }

    /// Adds an arbitrary header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Signature header value that will be sent, if any.
    pub fn signature_value(&self) -> Option<String> {
        match &self.signature {
            Header::Computed => Some(sign_body(&self.body, &self.signing_key)),
            Header::Explicit(value) => Some(value.clone()),
            Header::Omitted => None,
        }
    }

    /// Body as it travels on the wire.
    pub fn wire_body(&self) -> Vec<u8> {
        if self.base64 {
            STANDARD.encode(&self.body).into_bytes()
        } else {
            self.body.clone()
        }
    }

    fn header_pairs(&self) -> Vec<(String, String)> {
        let mut headers = vec![("content-type".to_string(), "application/json".to_string())];
        if let Some(credential) = &self.credential {
            headers.push(("authorization".to_string(), credential.clone()));
        }
        if let Some(signature) = self.signature_value() {
            headers.push(("cko-signature".to_string(), signature));
        }
        headers.extend(self.extra_headers.iter().cloned());
        headers
    }

    /// Builds a transport-neutral request.
    pub fn build(&self) -> InboundRequest {
        InboundRequest::from_pairs(
            self.header_pairs(),
            Bytes::from(self.wire_body()),
            BodyEncoding::from_flag(self.base64),
        )
    }

    /// Builds an HTTP request for `POST /webhooks`.
    pub fn http_request(&self) -> http::Request<Body> {
        let mut builder = http::Request::builder().method(http::Method::POST).uri("/webhooks");
        for (name, value) in self.header_pairs() {
            builder = builder.header(name, value);
        }
        if self.base64 {
            builder = builder.header("content-transfer-encoding", "base64");
        }

        builder.body(Body::from(self.wire_body())).expect("test request headers must be valid")
    }

    /// Builds the gateway proxy envelope for `POST /gateway/events`.
    pub fn gateway_event(&self) -> Value {
        let headers: Map<String, Value> =
            self.header_pairs().into_iter().map(|(k, v)| (k, Value::String(v))).collect();

        json!({
            "headers": headers,
            "body": String::from_utf8_lossy(&self.wire_body()),
            "isBase64Encoded": self.base64,
        })
    }

    /// Builds an HTTP request carrying the gateway envelope.
    pub fn gateway_http_request(&self) -> http::Request<Body> {
        http::Request::builder()
            .method(http::Method::POST)
            .uri("/gateway/events")
            .header("content-type", "application/json")
            .body(Body::from(self.gateway_event().to_string()))
            .expect("gateway request must be valid")
    }
}
