//! User and token persistence.
//!
//! Writes are column-scoped (`update_password_hash`, `mark_email_verified`) so a
//! password reset and an email verification racing on the same user cannot
//! overwrite each other's field.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod seed;

pub use memory::{InMemoryTokenStore, InMemoryUserStore};
pub use postgres::{PgTokenStore, PgUserStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a user; the store assigns `id` and `created_at`.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub email_verified: bool,
}

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(UserRecord),
    Conflict,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;

    /// Insert a user; `Conflict` if the email is already taken.
    async fn create(&self, user: NewUser) -> Result<CreateOutcome>;

    /// Returns `false` if no user has this id.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool>;

    /// Returns `false` if no user has this id.
    async fn mark_email_verified(&self, id: Uuid) -> Result<bool>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<()>;
}
