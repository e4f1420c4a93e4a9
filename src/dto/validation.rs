//! Validation helpers for request payloads.

use validator::ValidationError;

/// Rejects values made only of whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }

    Ok(())
}

/// Passwords need at least one letter and one digit.
pub fn validate_password_mix(value: &str) -> Result<(), ValidationError> {
    let has_letter = value.chars().any(|c| c.is_alphabetic());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        let mut err = ValidationError::new("password_mix");
        err.message = Some("password must contain a letter and a digit".into());
        return Err(err);
    }

    Ok(())
}
