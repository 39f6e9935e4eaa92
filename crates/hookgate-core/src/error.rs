//! Error types and result handling for the ingestion pipeline.
//!
//! Defines the pipeline error taxonomy with stable codes for log
//! disambiguation, the fixed HTTP status each error maps to, and the
//! collaborator errors raised by secret providers and event stores.

use http::StatusCode;
use thiserror::Error;

/// Result type alias using `GateError`.
pub type Result<T> = std::result::Result<T, GateError>;

/// Public message returned with a successful ingestion.
pub const OK_MESSAGE: &str = "OK";
/// Public message for a missing or invalid credential.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
/// Public message for a request without a body.
pub const MISSING_BODY_MESSAGE: &str = "Missing body";
/// Public message for a signature that does not verify.
pub const INVALID_SIGNATURE_MESSAGE: &str = "Invalid signature";
/// Public message for a failed persistence call.
pub const PERSISTENCE_FAILED_MESSAGE: &str = "Failed to process webhook data";
/// Public message for every other internal failure.
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Coarse classification of pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential missing or not matching the expected token.
    Unauthorized,
    /// Body missing or payload not parseable.
    MalformedRequest,
    /// Signature missing, malformed or not matching.
    InvalidSignature,
    /// The event store rejected or failed the write.
    PersistenceFailure,
    /// Anything unanticipated.
    InternalFault,
}

/// Pipeline error with codes matching the ingestion contract.
#[derive(Debug, Error)]
pub enum GateError {
    /// Credential missing or invalid (E1001).
    #[error("[E1001] Unauthorized: credential missing or invalid")]
    Unauthorized,

    /// Request carried no body (E1002).
    #[error("[E1002] Missing body")]
    MissingBody,

    /// Signature verification failed (E1003).
    #[error("[E1003] Invalid signature: {reason}")]
    InvalidSignature {
        /// Short, secret-free reason for the failure
        reason: String,
    },

    /// Verified payload could not be parsed as JSON (E1004).
    #[error("[E1004] Malformed payload: {0}")]
    MalformedPayload(String),

    /// Event store write failed (E2001).
    #[error("[E2001] Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Secret material could not be loaded (E3001).
    #[error("[E3001] Secrets unavailable: {0}")]
    SecretsUnavailable(#[from] SecretError),

    /// Unexpected internal fault.
    #[error("[E9999] Internal fault: {0}")]
    Internal(String),
}

impl GateError {
    /// Creates an invalid signature error with the given reason.
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature { reason: reason.into() }
    }

    /// Returns the error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "E1001",
            Self::MissingBody => "E1002",
            Self::InvalidSignature { .. } => "E1003",
            Self::MalformedPayload(_) => "E1004",
            Self::Persistence(_) => "E2001",
            Self::SecretsUnavailable(_) => "E3001",
            Self::Internal(_) => "E9999",
        }
    }

    /// Returns the taxonomy bucket for this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::MissingBody | Self::MalformedPayload(_) => ErrorKind::MalformedRequest,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::Persistence(_) => ErrorKind::PersistenceFailure,
            Self::SecretsUnavailable(_) | Self::Internal(_) => ErrorKind::InternalFault,
        }
    }

    /// Returns the HTTP status reported to the caller.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MissingBody | Self::InvalidSignature { .. } => StatusCode::BAD_REQUEST,
            Self::MalformedPayload(_)
            | Self::Persistence(_)
            | Self::SecretsUnavailable(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message placed in the response body.
    ///
    /// Never includes caller input or collaborator detail.
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => UNAUTHORIZED_MESSAGE,
            Self::MissingBody => MISSING_BODY_MESSAGE,
            Self::InvalidSignature { .. } => INVALID_SIGNATURE_MESSAGE,
            Self::Persistence(_) => PERSISTENCE_FAILED_MESSAGE,
            Self::MalformedPayload(_) | Self::SecretsUnavailable(_) | Self::Internal(_) => {
                SERVER_ERROR_MESSAGE
            },
        }
    }

    /// Whether the request was refused before any trusted work happened.
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::MissingBody | Self::InvalidSignature { .. })
    }
}

/// Errors raised by event store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// The store is not reachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the event.
    #[error("event rejected: {0}")]
    Rejected(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable(err.to_string())
            },
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::Rejected(format!("check constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Errors raised while loading secret material.
#[derive(Debug, Clone, Error)]
pub enum SecretError {
    /// A required secret is not configured.
    #[error("secret {name} is not configured")]
    Missing {
        /// Name of the missing secret
        name: String,
    },

    /// A required secret is configured but empty.
    #[error("secret {name} is empty")]
    Empty {
        /// Name of the empty secret
        name: String,
    },

    /// The provider itself failed.
    #[error("secret provider failed: {0}")]
    Provider(String),
}
