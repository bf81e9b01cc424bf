//! bcrypt hashing, offloaded to the blocking pool.

use anyhow::{Context, Result};

/// Work factor used for every stored hash.
pub const BCRYPT_COST: u32 = 10;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt only reads the first 72 bytes of its input.
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password with a fresh salt.
///
/// # Errors
/// Returns an error if bcrypt fails or the blocking task panics.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

/// Compare a password against a stored hash.
///
/// # Errors
/// Returns an error if the stored hash is malformed or the blocking task panics.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .context("password verification task failed")?
        .context("failed to verify password")
}
