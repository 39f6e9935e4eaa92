//! Webhook validation pipeline.
//!
//! Every request walks the same fixed sequence:
//!
//! ```text
//! START -> AUTH_CHECKED -> BODY_PRESENT -> SIGNATURE_VERIFIED -> PERSISTED -> DONE
//! ```
//!
//! Any stage may end the walk in `REJECTED` (401/400) or `FAILED` (500).
//! The credential is checked before the signature, and the signature before
//! the body is parsed or written, so untrusted bytes are never interpreted
//! or persisted. Each stage returns an explicit `Result`; the controller
//! turns the first error into the response. A panic anywhere in the walk is
//! caught and answered with a generic 500.

use std::{fmt, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use hookgate_core::{
    CachedSecrets, EventStore, GateError, InboundRequest, Result, SecretMaterial, ValidatedEvent,
    WriteOutcome,
};
use tracing::{debug, error, field, info, instrument, warn, Span};

use crate::{auth, crypto, response::WebhookResponse};

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Nothing checked yet.
    Start,
    /// Credential accepted.
    AuthChecked,
    /// Body present.
    BodyPresent,
    /// Signature verified over the raw body.
    SignatureVerified,
    /// Event handed to the store.
    Persisted,
    /// Response produced.
    Done,
    /// Refused before any trusted work.
    Rejected,
    /// Failed after the request was trusted, or internally.
    Failed,
}

impl Stage {
    /// Uppercase state name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::AuthChecked => "AUTH_CHECKED",
            Self::BodyPresent => "BODY_PRESENT",
            Self::SignatureVerified => "SIGNATURE_VERIFIED",
            Self::Persisted => "PERSISTED",
            Self::Done => "DONE",
            Self::Rejected => "REJECTED",
            Self::Failed => "FAILED",
        }
    }

    /// Terminal state an error leads to.
    pub const fn terminal_for(error: &GateError) -> Self {
        if error.is_rejection() {
            Self::Rejected
        } else {
            Self::Failed
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrates authorization, signature verification and persistence.
///
/// The store write is always awaited to completion once started; only the
/// secret load is bounded, by [`Pipeline::with_secret_timeout`].
pub struct Pipeline {
    secrets: Arc<CachedSecrets>,
    store: Arc<dyn EventStore>,
    secret_timeout: Option<Duration>,
}

impl Pipeline {
    /// Creates a pipeline over the given collaborators.
    pub fn new(secrets: Arc<CachedSecrets>, store: Arc<dyn EventStore>) -> Self {
        Self { secrets, store, secret_timeout: None }
    }

    /// Bounds how long a request waits for secret material.
    ///
    /// A load that overruns is answered with a server error and retried by
    /// the next request.
    #[must_use]
    pub fn with_secret_timeout(mut self, timeout: Duration) -> Self {
        self.secret_timeout = Some(timeout);
        self
    }

    /// Secret cache used by this pipeline.
    pub fn secrets(&self) -> &Arc<CachedSecrets> {
        &self.secrets
    }

    /// Event store used by this pipeline.
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Processes one request and produces its single response.
    ///
    /// Never fails: every error, including a panic, becomes a response.
    #[instrument(
        name = "process_webhook",
        skip_all,
        fields(
            has_credential = request.credential().is_some(),
            has_signature = request.signature().is_some(),
            body_len = request.body().len(),
            encoding = request.encoding().as_str(),
            stage = field::Empty,
            error_code = field::Empty,
        )
    )]
    pub async fn process(&self, request: &InboundRequest) -> WebhookResponse {
        let outcome = AssertUnwindSafe(self.run(request)).catch_unwind().await;

        match outcome {
            Ok(Ok(write)) => {
                enter(Stage::Done);
                info!(duplicate = write == WriteOutcome::Duplicate, "Webhook accepted");
                WebhookResponse::ok()
            },
            Ok(Err(err)) => {
                let span = Span::current();
                span.record("stage", Stage::terminal_for(&err).as_str());
                span.record("error_code", err.code());

                if err.is_rejection() {
                    warn!(error = %err, "Webhook rejected");
                } else {
                    error!(error = %err, "Webhook processing failed");
                }

                WebhookResponse::from_error(&err)
            },
            Err(_) => {
                Span::current().record("stage", Stage::Failed.as_str());
                error!("Webhook pipeline panicked");
                WebhookResponse::server_error()
            },
        }
    }

    async fn run(&self, request: &InboundRequest) -> Result<WriteOutcome> {
        enter(Stage::Start);
        let secrets = self.load_secrets().await?;

        authorize(request, &secrets)?;
        enter(Stage::AuthChecked);

        if !request.has_body() {
            return Err(GateError::MissingBody);
        }
        enter(Stage::BodyPresent);

        let raw_body = request.raw_body()?;
        verify_signature(&raw_body, request, &secrets)?;
        enter(Stage::SignatureVerified);

        let event = ValidatedEvent::parse(&raw_body)?;
        debug!(event_id = %event.id, event_type = ?event.event_type, "Payload parsed");

        let outcome = self.store.write(event).await?;
        enter(Stage::Persisted);

        Ok(outcome)
    }
}

impl Pipeline {
    async fn load_secrets(&self) -> Result<Arc<SecretMaterial>> {
        let Some(timeout) = self.secret_timeout else {
            return Ok(self.secrets.get().await?);
        };

        match tokio::time::timeout(timeout, self.secrets.get()).await {
            Ok(loaded) => Ok(loaded?),
            Err(_) => Err(GateError::Internal(format!(
                "secret material not loaded within {}ms",
                timeout.as_millis()
            ))),
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("secrets", &self.secrets)
            .field("secret_timeout", &self.secret_timeout)
            .finish_non_exhaustive()
    }
}

fn enter(stage: Stage) {
    Span::current().record("stage", stage.as_str());
    debug!(stage = %stage, "Pipeline transition");
}

fn authorize(request: &InboundRequest, secrets: &SecretMaterial) -> Result<()> {
    let credential = request.credential().map(|c| c.expose());

    if auth::check(credential, secrets.auth_token()) {
        Ok(())
    } else {
        Err(GateError::Unauthorized)
    }
}

fn verify_signature(
    raw_body: &[u8],
    request: &InboundRequest,
    secrets: &SecretMaterial,
) -> Result<()> {
    let supplied = request.signature().map(|s| s.expose());

    crypto::check_signature(raw_body, supplied, secrets.signing_key())
        .map_err(|e| GateError::invalid_signature(e.reason()))
}

#[cfg(test)]
mod tests {
    use axum::http;
    use hookgate_core::{BodyEncoding, BodyFault, InMemoryEventStore, SecretMaterial};

    use super::*;

    fn pipeline() -> (Pipeline, Arc<InMemoryEventStore>) {
        let store = Arc::new(InMemoryEventStore::new());
        let secrets = Arc::new(CachedSecrets::preloaded(
            SecretMaterial::new("token", "key").unwrap(),
        ));
        (Pipeline::new(secrets, store.clone()), store)
    }

    fn request(headers: &[(&str, &str)], body: &str) -> InboundRequest {
        InboundRequest::from_pairs(headers.iter().copied(), body.to_string(), BodyEncoding::Identity)
    }

    #[test]
    fn terminal_stage_follows_error_class() {
        assert_eq!(Stage::terminal_for(&GateError::Unauthorized), Stage::Rejected);
        assert_eq!(Stage::terminal_for(&GateError::MissingBody), Stage::Rejected);
        assert_eq!(Stage::terminal_for(&GateError::Internal("x".into())), Stage::Failed);
    }

    #[tokio::test]
    async fn valid_request_is_persisted() {
        let (pipeline, store) = pipeline();
        let body = r#"{"id":"evt_1"}"#;
        let signature = crypto::sign(body.as_bytes(), b"key").unwrap();

        let response = pipeline
            .process(&request(&[("authorization", "token"), ("cko-signature", signature.as_str())], body))
            .await;

        assert_eq!(response, WebhookResponse::ok());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unauthorized_request_never_reaches_store() {
        let (pipeline, store) = pipeline();
        let body = r#"{"id":"evt_1"}"#;
        let signature = crypto::sign(body.as_bytes(), b"key").unwrap();

        let response = pipeline
            .process(&request(&[("authorization", "wrong"), ("cko-signature", signature.as_str())], body))
            .await;

        assert_eq!(response.status().as_u16(), 401);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn authorization_is_checked_before_body() {
        let (pipeline, _) = pipeline();

        let response = pipeline.process(&request(&[], "")).await;

        assert_eq!(response.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn oversized_body_is_checked_after_credential() {
        let (pipeline, store) = pipeline();
        let mut headers = http::HeaderMap::new();
        headers.insert("cko-signature", http::HeaderValue::from_static("00"));

        let anonymous = InboundRequest::with_body_fault(
            headers.clone(),
            BodyEncoding::Identity,
            BodyFault::TooLarge,
        );
        assert_eq!(pipeline.process(&anonymous).await.status().as_u16(), 401);

        headers.insert("authorization", http::HeaderValue::from_static("token"));
        let authorized =
            InboundRequest::with_body_fault(headers, BodyEncoding::Identity, BodyFault::TooLarge);
        let response = pipeline.process(&authorized).await;

        assert_eq!(response.status().as_u16(), 400);
        assert_eq!(response.body_json(), r#"{"error":"Invalid signature"}"#);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn unparseable_verified_payload_is_server_error() {
        let (pipeline, store) = pipeline();
        let body = "not json";
        let signature = crypto::sign(body.as_bytes(), b"key").unwrap();

        let response = pipeline
            .process(&request(&[("authorization", "token"), ("cko-signature", signature.as_str())], body))
            .await;

        assert_eq!(response, WebhookResponse::server_error());
        assert!(store.is_empty().await);
    }
}
