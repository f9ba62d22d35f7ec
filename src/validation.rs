// Validation utilities module
// Custom field validators and the `{field: reason}` mapping used in error responses

use std::collections::BTreeMap;

use validator::{ValidationError, ValidationErrors};

pub const NICKNAME_MIN: usize = 3;
pub const NICKNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 5;
/// Width of the `users.email` column
pub const EMAIL_MAX: usize = 255;

/// Flattens validator output into a stable `{field: reason}` map
///
/// The reason is the validator's message when one is set, otherwise its code.
/// Only the first failure per field is reported.
pub fn field_errors(errors: &ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, failures)| {
            failures.first().map(|failure| {
                let reason = failure
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| failure.code.to_string());
                (field.to_string(), reason)
            })
        })
        .collect()
}

/// Validates a display name: 3 to 50 characters after trimming, no control characters
pub fn validate_nickname(nickname: &str) -> Result<(), ValidationError> {
    let trimmed = nickname.trim();
    let len = trimmed.chars().count();

    if len < NICKNAME_MIN || len > NICKNAME_MAX {
        let mut err = ValidationError::new("length");
        err.message = Some(
            format!(
                "Nickname must be between {} and {} characters",
                NICKNAME_MIN, NICKNAME_MAX
            )
            .into(),
        );
        return Err(err);
    }

    if trimmed.chars().any(char::is_control) {
        let mut err = ValidationError::new("invalid_characters");
        err.message = Some("Nickname must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a path id: positive integer
pub fn parse_account_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Normalizes an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
