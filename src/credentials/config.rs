use std::time::Duration;

use super::password::BCRYPT_COST;
use super::session::DEFAULT_SESSION_TTL_SECONDS;
use super::tokens::DEFAULT_TOKEN_TTL_SECONDS;

const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_TOKEN_SWEEP_SECONDS: u64 = 5 * 60;

/// Upper bound for token and session lifetimes (ten years).
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct CredentialConfig {
    frontend_base_url: String,
    token_ttl_seconds: i64,
    session_ttl_seconds: i64,
    bcrypt_cost: u32,
    token_sweep_interval: Duration,
}

impl CredentialConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            bcrypt_cost: BCRYPT_COST,
            token_sweep_interval: Duration::from_secs(DEFAULT_TOKEN_SWEEP_SECONDS),
        }
    }

    /// Clamped to `1..=MAX_TTL_SECONDS`.
    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds.clamp(1, MAX_TTL_SECONDS);
        self
    }

    /// Clamped to `1..=MAX_TTL_SECONDS`.
    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds.clamp(1, MAX_TTL_SECONDS);
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Zero disables the background sweep.
    #[must_use]
    pub fn with_token_sweep_seconds(mut self, seconds: u64) -> Self {
        self.token_sweep_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }

    #[must_use]
    pub fn token_sweep_interval(&self) -> Option<Duration> {
        if self.token_sweep_interval.is_zero() {
            None
        } else {
            Some(self.token_sweep_interval)
        }
    }
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}
