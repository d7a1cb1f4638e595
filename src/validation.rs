//! Input validation for player handles and catalog text fields.

use std::collections::BTreeSet;

pub const HANDLE_MIN_LEN: usize = 2;
pub const HANDLE_MAX_LEN: usize = 30;
pub const NAME_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Validation errors with messages suitable for returning to players.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Blank { field: &'static str },

    #[error("Handle is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("{field} is too long (maximum {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("Handle cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Handle contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Handle is a reserved name")]
    Reserved,

    #[error("{field} contains control characters")]
    ControlCharacters { field: &'static str },
}

fn reserved_handles() -> &'static [&'static str] {
    &[
        "admin", "administrator", "root", "system", "sysop", "operator", "guest",
        "anonymous", "moderator", "server", "levelup",
    ]
}

/// Validate a player handle. Handles are ASCII letters, digits, `_`, `-` and `.`.
pub fn validate_handle(handle: &str) -> Result<String, ValidationError> {
    let trimmed = handle.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field: "Handle" });
    }
    if trimmed != handle {
        return Err(ValidationError::InvalidWhitespace);
    }
    if trimmed.chars().count() < HANDLE_MIN_LEN {
        return Err(ValidationError::TooShort { min: HANDLE_MIN_LEN });
    }
    if trimmed.chars().count() > HANDLE_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "Handle",
            max: HANDLE_MAX_LEN,
        });
    }

    let invalid: BTreeSet<char> = trimmed
        .chars()
        .filter(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
        .collect();
    if !invalid.is_empty() {
        return Err(ValidationError::InvalidCharacters {
            chars: invalid.into_iter().collect(),
        });
    }

    if reserved_handles().contains(&trimmed.to_ascii_lowercase().as_str()) {
        return Err(ValidationError::Reserved);
    }

    Ok(trimmed.to_string())
}

/// Trim and check a required single-line name (items, missions).
pub fn validate_name(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    if trimmed.chars().count() > NAME_MAX_LEN {
        return Err(ValidationError::TooLong {
            field,
            max: NAME_MAX_LEN,
        });
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters { field });
    }
    Ok(trimmed.to_string())
}

/// Free-text descriptions may be empty but are length-capped. Newlines and tabs are kept.
pub fn validate_description(raw: &str) -> Result<String, ValidationError> {
    if raw.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(ValidationError::TooLong {
            field: "Description",
            max: DESCRIPTION_MAX_LEN,
        });
    }
    if raw.chars().any(|c| c.is_control() && c != '\n' && c != '\t') {
        return Err(ValidationError::ControlCharacters {
            field: "Description",
        });
    }
    Ok(raw.trim().to_string())
}
