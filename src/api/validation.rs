use std::sync::OnceLock;

use regex::Regex;

use super::ApiError;
use crate::constants::{
    EMAIL_MAX_LEN, NAME_MAX_LEN, RESERVED_USERNAME, SCORE_MAX, SCORE_MIN, USERNAME_MAX_LEN,
};
use crate::entities::users;

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex"))
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid regex"))
}

pub fn validate_username(username: &str) -> Result<&str, ApiError> {
    if username.is_empty() {
        return Err(ApiError::validation_field(
            "username",
            "Username cannot be empty",
        ));
    }
    if username.len() > USERNAME_MAX_LEN {
        return Err(ApiError::validation_field(
            "username",
            format!("Username must be {USERNAME_MAX_LEN} characters or fewer"),
        ));
    }
    if !username_pattern().is_match(username) {
        return Err(ApiError::validation_field(
            "username",
            "Username may contain only letters, digits and @/./+/-/_ characters",
        ));
    }
    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(ApiError::validation_field(
            "username",
            format!("Username '{RESERVED_USERNAME}' is reserved"),
        ));
    }
    Ok(username)
}

pub fn validate_email(email: &str) -> Result<&str, ApiError> {
    if email.len() > EMAIL_MAX_LEN {
        return Err(ApiError::validation_field(
            "email",
            format!("Email must be {EMAIL_MAX_LEN} characters or fewer"),
        ));
    }
    if !email_pattern().is_match(email) {
        return Err(ApiError::validation_field(
            "email",
            "Enter a valid email address",
        ));
    }
    Ok(email)
}

pub fn validate_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation_field(
            field,
            format!("{field} cannot be empty"),
        ));
    }
    if value.len() > NAME_MAX_LEN {
        return Err(ApiError::validation_field(
            field,
            format!("{field} must be {NAME_MAX_LEN} characters or fewer"),
        ));
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<&str, ApiError> {
    if slug.is_empty() || slug.len() > NAME_MAX_LEN || !slug_pattern().is_match(slug) {
        return Err(ApiError::validation_field(
            "slug",
            "Slug may contain only letters, digits, hyphens and underscores",
        ));
    }
    Ok(slug)
}

pub fn validate_year(year: i32) -> Result<i32, ApiError> {
    use chrono::Datelike;

    let current = chrono::Utc::now().year();
    if year < 0 || year > current {
        return Err(ApiError::validation_field(
            "year",
            format!("Year must be between 0 and {current}"),
        ));
    }
    Ok(year)
}

pub fn validate_score(score: i16) -> Result<i16, ApiError> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        return Err(ApiError::validation_field(
            "score",
            format!("Score must be between {SCORE_MIN} and {SCORE_MAX}"),
        ));
    }
    Ok(score)
}

/// Outcome of matching a signup request against existing identities.
#[derive(Debug, PartialEq, Eq)]
pub enum SignupIdentity {
    /// Nobody owns the username or the email.
    New,
    /// The exact (username, email) pair is already registered.
    Resend,
    /// The username belongs to a record with a different email.
    DuplicateUsername,
    /// The email belongs to a different username.
    DuplicateEmail,
}

/// Pure identity check shared by signup and the conflict-translation path.
/// Callers pass the current owners of the requested username and email.
pub fn check_signup_identity(
    username_owner: Option<&users::Model>,
    email_owner: Option<&users::Model>,
    email: &str,
) -> SignupIdentity {
    match username_owner {
        Some(owner) if owner.email == email => SignupIdentity::Resend,
        Some(_) => SignupIdentity::DuplicateUsername,
        None if email_owner.is_some() => SignupIdentity::DuplicateEmail,
        None => SignupIdentity::New,
    }
}
