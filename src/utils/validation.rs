//! Input validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Phone numbers: digits with optional leading +, spaces, parentheses, dashes.
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{4,19}$").unwrap());

/// Organization slugs: lowercase kebab-case.
static SLUG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

/// Validate a client phone number
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_REGEX.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message("invalid phone number".into()))
    }
}

/// Validate an organization slug
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if !slug.is_empty() && slug.len() <= 64 && SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        Err(ValidationError::new("slug")
            .with_message("slug must be lowercase letters, digits and dashes".into()))
    }
}

/// Validate a username: starts with a letter, then letters/digits/._-
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    static USERNAME_REGEX: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9._\-]*$").unwrap());

    if !username.is_empty() && username.len() <= 64 && USERNAME_REGEX.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message("invalid username".into()))
    }
}
