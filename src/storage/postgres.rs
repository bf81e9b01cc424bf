//! PostgreSQL-backed stores (`sql/schema.sql`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::{info_span, Instrument};
use uuid::Uuid;

use super::{CreateOutcome, NewUser, UserRecord, UserStore};
use crate::credentials::tokens::{hash_token, TokenGrant, TokenKind, TokenStore};

const USER_COLUMNS: &str = "id, email, name, password_hash, email_verified, created_at";

fn db_span(operation: &'static str, statement: &str) -> tracing::Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        email_verified: row.get("email_verified"),
        created_at: row.get("created_at"),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        let query = format!(
            r"
            INSERT INTO users (id, email, name, password_hash, email_verified)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.email_verified)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(CreateOutcome::Created(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to update password hash")?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<bool> {
        let query = "UPDATE users SET email_verified = TRUE WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to mark email verified")?;
        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

/// Tokens stored as SHA-256 hashes; the raw value only ever lives in the email link.
#[derive(Clone, Debug)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, kind: TokenKind, token: &str, grant: TokenGrant) -> Result<bool> {
        let query = r"
            INSERT INTO single_use_tokens (kind, token_hash, email, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, token_hash) DO NOTHING
        ";
        let result = sqlx::query(query)
            .bind(kind.as_str())
            .bind(hash_token(token))
            .bind(&grant.email)
            .bind(grant.expires_at)
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await
            .with_context(|| format!("failed to insert {kind} token"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, kind: TokenKind, token: &str) -> Result<Option<TokenGrant>> {
        let query = r"
            SELECT email, expires_at
            FROM single_use_tokens
            WHERE kind = $1 AND token_hash = $2
        ";
        let row = sqlx::query(query)
            .bind(kind.as_str())
            .bind(hash_token(token))
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await
            .with_context(|| format!("failed to lookup {kind} token"))?;
        Ok(row.map(|row| TokenGrant {
            email: row.get("email"),
            expires_at: row.get("expires_at"),
        }))
    }

    async fn consume(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenGrant>> {
        // One statement: only the caller whose DELETE hits the row gets it back.
        let query = r"
            DELETE FROM single_use_tokens
            WHERE kind = $1
              AND token_hash = $2
              AND expires_at > $3
            RETURNING email, expires_at
        ";
        let row = sqlx::query(query)
            .bind(kind.as_str())
            .bind(hash_token(token))
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .with_context(|| format!("failed to consume {kind} token"))?;
        Ok(row.map(|row| TokenGrant {
            email: row.get("email"),
            expires_at: row.get("expires_at"),
        }))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let query = "DELETE FROM single_use_tokens WHERE expires_at <= $1";
        let result = sqlx::query(query)
            .bind(now)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await
            .context("failed to purge expired tokens")?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[tokio::test]
    async fn ping_fails_without_database() -> Result<()> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://postgres@127.0.0.1:1/keyward")?;
        assert!(PgUserStore::new(pool).ping().await.is_err());
        Ok(())
    }
}
