use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    dao::session::UserProfile,
    dto::validation::{validate_not_blank, validate_password_mix},
};

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8), custom(function = "validate_password_mix"))]
    pub password: String,
    /// Only checked locally.
    #[serde(skip_serializing)]
    #[validate(must_match(other = "password"))]
    pub confirm_password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 32))]
    pub username: Option<String>,
}

/// Body of `POST /auth/forgot-password`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// Body of `POST /auth/reset-password`.
#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub token: String,
    #[validate(length(min = 8), custom(function = "validate_password_mix"))]
    pub new_password: String,
}

/// Payload returned by login and register.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthDataDto {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_matching_passwords() {
        let mut request = RegisterRequest {
            email: "player@example.com".into(),
            password: "chords42".into(),
            confirm_password: "chords42".into(),
            username: Some("ears".into()),
        };
        assert!(request.validate().is_ok());

        request.confirm_password = "chords43".into();
        assert!(request.validate().is_err());
    }

    #[test]
    fn confirmation_is_not_sent() {
        let request = RegisterRequest {
            email: "player@example.com".into(),
            password: "chords42".into(),
            confirm_password: "chords42".into(),
            username: None,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("confirm_password").is_none());
        assert!(body.get("username").is_none());
    }

    #[test]
    fn login_rejects_malformed_email() {
        let request = LoginRequest {
            email: "not-an-email".into(),
            password: "x".into(),
        };
        assert!(request.validate().is_err());
    }
}
