use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::{backend::error::BackendError, storage::StorageError},
    state::{AbortError, ApplyError, PlanError},
};

/// Error code the backend uses to request the upsell flow.
pub const CODE_SUBSCRIPTION_REQUIRED: &str = "SUBSCRIPTION_REQUIRED";
/// Generic retry-capable failure.
pub const CODE_NETWORK_ERROR: &str = "NETWORK_ERROR";
/// Backend throttled the request.
pub const CODE_RATE_LIMITED: &str = "RATE_LIMITED";
/// Client-side form validation failed.
pub const CODE_VALIDATION_ERROR: &str = "VALIDATION_ERROR";
/// Local persistence failed.
pub const CODE_STORAGE_ERROR: &str = "STORAGE_ERROR";
/// Action refused in the current round phase.
pub const CODE_INVALID_STATE: &str = "INVALID_STATE";

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Client-side input checks failed; nothing was sent.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The requested content needs an active subscription.
    #[error("subscription required: {0}")]
    SubscriptionRequired(String),
    /// The backend kept throttling the request.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Transport failure or a rejection without a recognised code.
    #[error("network error: {message}")]
    Network {
        /// Human readable message, backend supplied when available.
        message: String,
        /// Backend error code, if any.
        code: Option<String>,
    },
    /// Local storage failed.
    #[error("storage failure")]
    Storage(#[source] StorageError),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl ServiceError {
    /// True when the caller should open the subscription upsell.
    pub fn is_subscription_required(&self) -> bool {
        matches!(self, ServiceError::SubscriptionRequired(_))
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(failure) if failure.is_subscription_required() => {
                ServiceError::SubscriptionRequired(failure.message)
            }
            BackendError::Rejected(failure) if failure.is_rate_limited() => {
                ServiceError::RateLimited(failure.message)
            }
            BackendError::Rejected(failure) => ServiceError::Network {
                message: failure.message,
                code: failure.code,
            },
            BackendError::InvalidRequest { source, .. } => {
                ServiceError::Validation(source.to_string())
            }
            other => ServiceError::Network {
                message: other.to_string(),
                code: None,
            },
        }
    }
}

/// Error normalised to the `{message, code?}` shape rendered by the error modals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// Message displayed to the player.
    pub message: String,
    /// Machine readable code, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&ServiceError> for ErrorInfo {
    fn from(err: &ServiceError) -> Self {
        let (message, code) = match err {
            ServiceError::Validation(message) => (message.clone(), CODE_VALIDATION_ERROR),
            ServiceError::SubscriptionRequired(message) => {
                (message.clone(), CODE_SUBSCRIPTION_REQUIRED)
            }
            ServiceError::RateLimited(message) => (message.clone(), CODE_RATE_LIMITED),
            ServiceError::Network { message, code } => {
                return Self {
                    message: message.clone(),
                    code: Some(code.clone().unwrap_or_else(|| CODE_NETWORK_ERROR.into())),
                };
            }
            ServiceError::Storage(source) => (source.to_string(), CODE_STORAGE_ERROR),
            ServiceError::InvalidState(message) => (message.clone(), CODE_INVALID_STATE),
        };

        Self {
            message,
            code: Some(code.into()),
        }
    }
}

impl From<PlanError> for ServiceError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::AlreadyPending => {
                ServiceError::InvalidState("a request is already in progress".into())
            }
            PlanError::InvalidTransition(invalid) => {
                ServiceError::InvalidState(invalid.to_string())
            }
        }
    }
}

impl From<ApplyError> for ServiceError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::NoPending => {
                ServiceError::InvalidState("round was reset before the response arrived".into())
            }
            ApplyError::IdMismatch { .. } => {
                ServiceError::InvalidState("response belongs to a superseded request".into())
            }
            ApplyError::PhaseMismatch { expected, actual } => ServiceError::InvalidState(format!(
                "round changed while the request was in flight \
                 (expected {expected:?}, got {actual:?})"
            )),
        }
    }
}

impl From<AbortError> for ServiceError {
    fn from(err: AbortError) -> Self {
        match err {
            AbortError::NoPending => ServiceError::InvalidState("no request in flight".into()),
            AbortError::IdMismatch { .. } => {
                ServiceError::InvalidState("request does not match the one in flight".into())
            }
        }
    }
}
