//! Mapping of pipeline outcomes to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hookgate_core::{
    error::{OK_MESSAGE, SERVER_ERROR_MESSAGE},
    GateError,
};
use serde::{Deserialize, Serialize};

/// JSON body of every pipeline response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    /// `{"message": ...}` on success.
    Message {
        /// Success message
        message: String,
    },
    /// `{"error": ...}` on failure.
    Error {
        /// Public error reason
        error: String,
    },
}

/// The single response produced for a webhook request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    status: StatusCode,
    body: ResponseBody,
}

impl WebhookResponse {
    /// `200 {"message":"OK"}`.
    pub fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Message { message: OK_MESSAGE.to_string() },
        }
    }

    /// Response for a pipeline error.
    pub fn from_error(error: &GateError) -> Self {
        Self {
            status: error.status(),
            body: ResponseBody::Error { error: error.public_message().to_string() },
        }
    }

    /// `500 {"error":"Server error"}`.
    pub fn server_error() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ResponseBody::Error { error: SERVER_ERROR_MESSAGE.to_string() },
        }
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Body serialized as compact JSON.
    pub fn body_json(&self) -> String {
        // Two string-only shapes; serialization cannot fail.
        serde_json::to_string(&self.body)
            .unwrap_or_else(|_| format!(r#"{{"error":"{SERVER_ERROR_MESSAGE}"}}"#))
    }
}

impl From<&GateError> for WebhookResponse {
    fn from(error: &GateError) -> Self {
        Self::from_error(error)
    }
}

impl IntoResponse for WebhookResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use hookgate_core::{SecretError, StoreError};

    use super::*;

    #[test]
    fn ok_body_shape() {
        assert_eq!(WebhookResponse::ok().body_json(), r#"{"message":"OK"}"#);
    }

    #[test]
    fn error_body_shapes() {
        let cases = [
            (GateError::Unauthorized, 401, r#"{"error":"Unauthorized"}"#),
            (GateError::MissingBody, 400, r#"{"error":"Missing body"}"#),
            (GateError::invalid_signature("mismatch"), 400, r#"{"error":"Invalid signature"}"#),
            (GateError::MalformedPayload("eof".into()), 500, r#"{"error":"Server error"}"#),
            (
                GateError::from(StoreError::Database("down".into())),
                500,
                r#"{"error":"Failed to process webhook data"}"#,
            ),
            (
                GateError::from(SecretError::Provider("down".into())),
                500,
                r#"{"error":"Server error"}"#,
            ),
        ];

        for (error, status, body) in cases {
            let response = WebhookResponse::from_error(&error);
            assert_eq!(response.status().as_u16(), status, "{error}");
            assert_eq!(response.body_json(), body, "{error}");
        }
    }

    #[test]
    fn into_response_keeps_status() {
        let response = WebhookResponse::from_error(&GateError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn body_round_trips_through_untagged_enum() {
        let body: ResponseBody = serde_json::from_str(r#"{"error":"Missing body"}"#).unwrap();
        assert_eq!(body, ResponseBody::Error { error: "Missing body".into() });
    }
}
