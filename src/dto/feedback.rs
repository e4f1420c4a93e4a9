use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::dto::validation::validate_not_blank;

/// Body of `POST /users/feedback`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct FeedbackRequest {
    #[validate(length(max = 2000), custom(function = "validate_not_blank"))]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<u8>,
}

/// Feedback item as returned by `GET /users/feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub created_at: Option<String>,
}
