//! Single-use reset and verification tokens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;

/// Tokens are valid for one hour after issue.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60;

/// Number of random bytes behind each token.
pub const TOKEN_BYTES: usize = 32;

/// Token namespace. A token issued in one never resolves in the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Reset,
    Verification,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::Verification => "verification",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a token grants: the owning (normalized) email until `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenGrant {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenGrant {
    /// A grant is usable strictly before its expiry instant.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a new grant. Returns `false` if the token already exists.
    async fn insert(&self, kind: TokenKind, token: &str, grant: TokenGrant) -> Result<bool>;

    /// Read a grant without consuming it. Expired grants are still returned.
    async fn find(&self, kind: TokenKind, token: &str) -> Result<Option<TokenGrant>>;

    /// Remove and return the grant if it exists and is unexpired at `now`.
    ///
    /// Check and delete happen as one step: of any number of concurrent callers
    /// presenting the same token, at most one receives `Some`.
    async fn consume(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenGrant>>;

    /// Drop every grant expired at `now`, returning how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Create a new token for an email link.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_token() -> Result<String> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(hex::encode(bytes))
}

/// Hash a token so persistent stores never keep the raw value.
#[must_use]
pub fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}
