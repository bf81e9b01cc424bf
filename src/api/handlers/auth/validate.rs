use regex::Regex;
use std::sync::LazyLock;

use crate::credentials::{
    normalize_email,
    password::{MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH},
};

pub(super) const INVALID_EMAIL: &str = "Invalid email";
pub(super) const NAME_TOO_SHORT: &str = "Name must be at least 2 characters";
pub(super) const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters";
pub(super) const PASSWORD_TOO_LONG: &str = "Password must be at most 72 characters";
pub(super) const PASSWORD_REQUIRED: &str = "Password is required";
pub(super) const MISSING_TOKEN: &str = "Missing token";

const MIN_NAME_LENGTH: usize = 2;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Lightweight email sanity check, applied to the normalized address.
pub(super) fn email(email: &str) -> Result<(), &'static str> {
    let normalized = normalize_email(email);
    if EMAIL_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(&normalized))
    {
        Ok(())
    } else {
        Err(INVALID_EMAIL)
    }
}

pub(super) fn name(name: &str) -> Result<(), &'static str> {
    if name.trim().chars().count() >= MIN_NAME_LENGTH {
        Ok(())
    } else {
        Err(NAME_TOO_SHORT)
    }
}

/// New passwords are bounded by bcrypt's 72 byte input limit.
pub(super) fn new_password(password: &str) -> Result<(), &'static str> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(PASSWORD_TOO_SHORT);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PASSWORD_TOO_LONG);
    }
    Ok(())
}

pub(super) fn password_present(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        Err(PASSWORD_REQUIRED)
    } else {
        Ok(())
    }
}

/// Returns the trimmed token.
pub(super) fn token(token: &str) -> Result<&str, &'static str> {
    let token = token.trim();
    if token.is_empty() {
        Err(MISSING_TOKEN)
    } else {
        Ok(token)
    }
}
