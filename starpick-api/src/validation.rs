//! Input validation for account and catalog fields.
//!
//! Validation errors surface as 400-class `ApiError`s; anything that passes
//! here is safe to hand to storage unchanged.

use crate::error::{ApiError, ApiResult};
use once_cell::sync::Lazy;
use regex::Regex;
use starpick_core::Tier;

/// Usernames: 3-30 characters, letters, digits, underscore, hyphen.
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,30}$").expect("Invalid username regex"));

/// Minimal structural email check; domain policy is applied separately.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex"));

/// Email providers accounts may register with.
const ALLOWED_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
];

/// Validate a username.
pub fn validate_username(username: &str) -> ApiResult<()> {
    if username.trim().is_empty() {
        return Err(ApiError::missing_field("username"));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ApiError::invalid_format(
            "username",
            "3-30 characters: letters, digits, '_' or '-'",
        ));
    }
    Ok(())
}

/// Validate password strength: at least 8 characters with an uppercase
/// letter, a lowercase letter, and a digit.
pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.is_empty() {
        return Err(ApiError::missing_field("password"));
    }
    if password.len() < 8
        || !password.chars().any(|c| c.is_ascii_uppercase())
        || !password.chars().any(|c| c.is_ascii_lowercase())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err(ApiError::validation_failed(
            "Password must be at least 8 characters and include an uppercase letter, \
             a lowercase letter, and a digit",
        ));
    }
    Ok(())
}

/// Validate an email address, enforcing the provider allowlist.
///
/// Returns the normalized (lowercased) address.
pub fn validate_email(email: &str) -> ApiResult<String> {
    if email.trim().is_empty() {
        return Err(ApiError::missing_field("email"));
    }
    let normalized = email.trim().to_lowercase();
    if !EMAIL_RE.is_match(&normalized) {
        return Err(ApiError::invalid_format("email", "a valid email address"));
    }
    let domain = normalized.rsplit('@').next().unwrap_or_default();
    if !ALLOWED_EMAIL_DOMAINS.contains(&domain) {
        return Err(ApiError::validation_failed(
            "Only Gmail and Microsoft email addresses are accepted",
        ));
    }
    Ok(normalized)
}

/// Validate a star name: non-empty after trimming, at most 100 characters.
///
/// Returns the trimmed name.
pub fn validate_star_name(name: &str) -> ApiResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    if trimmed.len() > 100 {
        return Err(ApiError::invalid_input("name must be at most 100 characters"));
    }
    Ok(trimmed)
}

/// Validate a raw tier value into a `Tier`.
pub fn validate_tier(value: i16) -> ApiResult<Tier> {
    Tier::new(value).map_err(|_| ApiError::invalid_range("tier", Tier::MIN, Tier::MAX))
}
