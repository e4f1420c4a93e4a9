//! Error types of the REST backend client.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use validator::ValidationErrors;

use crate::error::CODE_SUBSCRIPTION_REQUIRED;

/// Convenient result alias returning [`BackendError`] failures.
pub type BackendResult<T> = Result<T, BackendError>;

/// Failures that can occur while talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build HTTP client")]
    ClientBuilder {
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// The request failed local validation and was not sent.
    #[error("invalid request for `{path}`: {source}")]
    InvalidRequest {
        /// Endpoint path.
        path: String,
        /// Validation failures.
        #[source]
        source: ValidationErrors,
    },
    /// The request could not be sent or its body could not be read.
    #[error("failed to reach `{path}`")]
    RequestSend {
        /// Endpoint path.
        path: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// A successful response did not contain the expected JSON.
    #[error("failed to decode response of `{path}`")]
    DecodeResponse {
        /// Endpoint path.
        path: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// The JSON decoded but violates the round invariants.
    #[error("invalid payload from `{path}`: {reason}")]
    InvalidPayload {
        /// Endpoint path.
        path: String,
        /// What was wrong.
        reason: String,
    },
    /// The backend rejected the request.
    #[error("{0}")]
    Rejected(ApiFailure),
}

/// Canonical backend rejection, whatever shape the error body had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    /// Endpoint path.
    pub path: String,
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Message suitable for display.
    pub message: String,
    /// Backend error code, when supplied.
    pub code: Option<String>,
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` rejected with {}: {}", self.path, self.status, self.message)
    }
}

impl ApiFailure {
    /// Normalise an error body.
    ///
    /// Accepted shapes: `{error: {message, code}}`, `{error: "message", code}`,
    /// `{message, code}`, or anything else (status reason is used as message).
    pub fn from_body(path: &str, status: StatusCode, body: &[u8]) -> Self {
        let value = serde_json::from_slice::<Value>(body).ok();
        let root = value.as_ref();
        let error = root.and_then(|v| v.get("error"));

        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .or_else(|| error.and_then(Value::as_str))
            .or_else(|| root.and_then(|v| v.get("message")).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        let code = error
            .and_then(|e| e.get("code"))
            .or_else(|| root.and_then(|v| v.get("code")))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            path: path.to_string(),
            status,
            message,
            code,
        }
    }

    /// HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }

    /// Backend asked for the subscription upsell.
    pub fn is_subscription_required(&self) -> bool {
        self.code.as_deref() == Some(CODE_SUBSCRIPTION_REQUIRED)
    }
}

impl BackendError {
    /// True for a 429 rejection, the only failure the sequence submit retries.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BackendError::Rejected(failure) if failure.is_rate_limited())
    }
}
