//! Inbound request and validated event models.
//!
//! `InboundRequest` is the transport-neutral view of a webhook call: a
//! case-insensitive header map, the body exactly as transmitted and a marker
//! for transport encoding. `ValidatedEvent` only exists after both the
//! credential and the signature have been checked.

use std::{borrow::Cow, fmt};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GateError, Result};

/// Header carrying the caller credential.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "cko-signature";

/// Strongly-typed identifier assigned to every stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Transport encoding applied to the body by whatever delivered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    /// Body bytes are the bytes the sender signed.
    #[default]
    Identity,
    /// Body is the standard base64 encoding of the bytes the sender signed.
    Base64,
}

impl BodyEncoding {
    /// Maps an `isBase64Encoded`-style flag to an encoding.
    pub const fn from_flag(is_base64_encoded: bool) -> Self {
        if is_base64_encoded {
            Self::Base64
        } else {
            Self::Identity
        }
    }

    /// Lowercase name for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Base64 => "base64",
        }
    }
}

/// Caller-supplied credential borrowed from the request headers.
///
/// `Debug` never prints the value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Credential<'a>(&'a str);

impl<'a> Credential<'a> {
    /// Returns the raw credential for comparison.
    pub const fn expose(&self) -> &'a str {
        self.0
    }
}

impl fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Caller-supplied signature borrowed from the request headers.
///
/// `Debug` never prints the value.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SignatureToken<'a>(&'a str);

impl<'a> SignatureToken<'a> {
    /// Returns the raw signature for verification.
    pub const fn expose(&self) -> &'a str {
        self.0
    }
}

impl fmt::Debug for SignatureToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignatureToken([REDACTED])")
    }
}

/// Why the transport could not hand over the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFault {
    /// The body exceeded the configured size limit.
    TooLarge,
    /// Reading the body failed, for example on a client disconnect.
    Unreadable,
}

/// Webhook call as received, before any validation.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    headers: HeaderMap,
    body: Bytes,
    encoding: BodyEncoding,
    body_fault: Option<BodyFault>,
}

impl InboundRequest {
    /// Creates a request from an HTTP header map.
    ///
    /// Names that carry several values keep only the first one.
    pub fn new(headers: HeaderMap, body: impl Into<Bytes>, encoding: BodyEncoding) -> Self {
        let mut single = HeaderMap::with_capacity(headers.keys_len());
        for name in headers.keys() {
            if let Some(value) = headers.get(name) {
                single.insert(name.clone(), value.clone());
            }
        }

        Self { headers: single, body: body.into(), encoding, body_fault: None }
    }

    /// Creates a request whose body the transport could not read.
    ///
    /// The headers are kept so the credential is still checked first. The
    /// fault surfaces when the signed bytes are requested.
    pub fn with_body_fault(headers: HeaderMap, encoding: BodyEncoding, fault: BodyFault) -> Self {
        Self { body_fault: Some(fault), ..Self::new(headers, Bytes::new(), encoding) }
    }

    /// Creates a request from loosely-typed header pairs.
    ///
    /// Pairs whose name or value is not a valid HTTP header are skipped. When
    /// two names differ only by case the all-lowercase spelling wins, even
    /// with an empty value. Among other spellings the lexicographically
    /// smallest wins, so the result does not depend on input order.
    pub fn from_pairs<I, K, V>(pairs: I, body: impl Into<Bytes>, encoding: BodyEncoding) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed: Vec<(bool, String, HeaderName, HeaderValue)> = pairs
            .into_iter()
            .filter_map(|(name, value)| {
                let name = name.as_ref();
                let header_name = HeaderName::from_bytes(name.as_bytes()).ok()?;
                let header_value = HeaderValue::from_str(value.as_ref()).ok()?;
                let is_lowercase = !name.bytes().any(|b| b.is_ascii_uppercase());
                Some((is_lowercase, name.to_string(), header_name, header_value))
            })
            .collect();

        // Later inserts replace earlier ones: lowercase spellings go last,
        // then smaller spellings after larger ones.
        parsed.sort_by(|(a_lower, a_name, _, _), (b_lower, b_name, _, _)| {
            a_lower.cmp(b_lower).then_with(|| b_name.cmp(a_name))
        });

        let mut headers = HeaderMap::with_capacity(parsed.len());
        for (_, _, name, value) in parsed {
            headers.insert(name, value);
        }

        Self { headers, body: body.into(), encoding, body_fault: None }
    }

    /// Looks up a header value case-insensitively.
    ///
    /// Values that are not visible ASCII are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the credential, if one was supplied.
    pub fn credential(&self) -> Option<Credential<'_>> {
        self.header(AUTHORIZATION_HEADER).map(Credential)
    }

    /// Returns the signature, if one was supplied.
    pub fn signature(&self) -> Option<SignatureToken<'_>> {
        self.header(SIGNATURE_HEADER).map(SignatureToken)
    }

    /// Returns the header map.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body exactly as transmitted.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the transport encoding of the body.
    pub fn encoding(&self) -> BodyEncoding {
        self.encoding
    }

    /// Returns the transport fault that prevented reading the body, if any.
    pub fn body_fault(&self) -> Option<BodyFault> {
        self.body_fault
    }

    /// Whether the request carries a non-empty body.
    ///
    /// A body the transport refused to read still counts as present.
    pub fn has_body(&self) -> bool {
        self.body_fault.is_some() || !self.body.is_empty()
    }

    /// Returns the bytes the sender signed.
    ///
    /// Identity bodies are borrowed untouched; base64 bodies are decoded.
    ///
    /// # Errors
    ///
    /// Returns `GateError::InvalidSignature` if the transport encoding is
    /// not valid base64 or the body exceeded the size limit, since the
    /// signed bytes cannot be recovered. Returns `GateError::Internal` if
    /// the body could not be read at all.
    pub fn raw_body(&self) -> Result<Cow<'_, [u8]>> {
        match self.body_fault {
            Some(BodyFault::TooLarge) => {
                return Err(GateError::invalid_signature("body exceeds size limit"));
            },
            Some(BodyFault::Unreadable) => {
                return Err(GateError::Internal("request body could not be read".to_string()));
            },
            None => {},
        }

        match self.encoding {
            BodyEncoding::Identity => Ok(Cow::Borrowed(self.body.as_ref())),
            BodyEncoding::Base64 => STANDARD
                .decode(self.body.as_ref())
                .map(Cow::Owned)
                .map_err(|_| GateError::invalid_signature("body is not valid base64")),
        }
    }
}

/// Payload that passed both the credential and the signature check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedEvent {
    /// Identifier assigned on receipt.
    pub id: EventId,
    /// Provider event identifier (`id` field of the payload), if present.
    pub source_event_id: Option<String>,
    /// Provider event type (`type` field of the payload), if present.
    pub event_type: Option<String>,
    /// Parsed payload.
    pub payload: serde_json::Value,
    /// Time the event was accepted.
    pub received_at: DateTime<Utc>,
}

impl ValidatedEvent {
    /// Parses verified body bytes into an event.
    ///
    /// Must only be called on bytes whose signature has been verified.
    ///
    /// # Errors
    ///
    /// Returns `GateError::MalformedPayload` if the bytes are not JSON.
    pub fn parse(raw_body: &[u8]) -> Result<Self> {
        let payload: serde_json::Value = serde_json::from_slice(raw_body)
            .map_err(|e| GateError::MalformedPayload(e.to_string()))?;

        let field = |name: &str| payload.get(name).and_then(|v| v.as_str()).map(String::from);
        let source_event_id = field("id");
        let event_type = field("type");

        Ok(Self { id: EventId::new(), source_event_id, event_type, payload, received_at: Utc::now() })
    }
}
