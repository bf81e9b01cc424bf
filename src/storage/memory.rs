//! Process-local stores for development and tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CreateOutcome, NewUser, UserRecord, UserStore};
use crate::credentials::tokens::{TokenGrant, TokenKind, TokenStore};

/// Users keyed by normalized email.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user. Not part of the credential lifecycle; lets tests simulate
    /// an account disappearing between token issue and use.
    pub async fn remove(&self, email: &str) -> Option<UserRecord> {
        self.users.lock().await.remove(email)
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.lock().await.get(email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let users = self.users.lock().await;
        Ok(users.values().find(|user| user.id == id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user.email) {
            return Ok(CreateOutcome::Conflict);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            email_verified: user.email_verified,
            created_at: Utc::now(),
        };
        users.insert(record.email.clone(), record.clone());
        Ok(CreateOutcome::Created(record))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let mut users = self.users.lock().await;
        match users.values_mut().find(|user| user.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<bool> {
        let mut users = self.users.lock().await;
        match users.values_mut().find(|user| user.id == id) {
            Some(user) => {
                user.email_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Token namespaces behind one mutex; consume is a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<(TokenKind, String), TokenGrant>>,
}

impl InMemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, kind: TokenKind, token: &str, grant: TokenGrant) -> Result<bool> {
        let mut tokens = self.tokens.lock().await;
        let key = (kind, token.to_string());
        if tokens.contains_key(&key) {
            return Ok(false);
        }
        tokens.insert(key, grant);
        Ok(true)
    }

    async fn find(&self, kind: TokenKind, token: &str) -> Result<Option<TokenGrant>> {
        let tokens = self.tokens.lock().await;
        Ok(tokens.get(&(kind, token.to_string())).cloned())
    }

    async fn consume(
        &self,
        kind: TokenKind,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenGrant>> {
        let mut tokens = self.tokens.lock().await;
        let key = (kind, token.to_string());
        // Expired grants stay put for the sweeper; only live ones are taken.
        match tokens.get(&key) {
            Some(grant) if !grant.is_expired(now) => Ok(tokens.remove(&key)),
            _ => Ok(None),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|_, grant| !grant.is_expired(now));
        Ok(u64::try_from(before - tokens.len()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "Alice".to_string(),
            password_hash: "hash".to_string(),
            email_verified: false,
        }
    }

    fn grant(expires_at: DateTime<Utc>) -> TokenGrant {
        TokenGrant {
            email: "a@x.com".to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() -> Result<()> {
        let store = InMemoryUserStore::new();
        assert!(matches!(
            store.create(new_user("a@x.com")).await?,
            CreateOutcome::Created(_)
        ));
        assert!(matches!(
            store.create(new_user("a@x.com")).await?,
            CreateOutcome::Conflict
        ));
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn column_updates_touch_only_their_field() -> Result<()> {
        let store = InMemoryUserStore::new();
        let CreateOutcome::Created(user) = store.create(new_user("a@x.com")).await? else {
            anyhow::bail!("expected user to be created");
        };

        assert!(store.update_password_hash(user.id, "new-hash").await?);
        assert!(store.mark_email_verified(user.id).await?);

        let stored = store.find_by_id(user.id).await?;
        let stored = stored.ok_or_else(|| anyhow::anyhow!("user missing"))?;
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.email_verified);
        assert_eq!(stored.name, "Alice");

        assert!(!store.update_password_hash(Uuid::new_v4(), "x").await?);
        assert!(!store.mark_email_verified(Uuid::new_v4()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn namespaces_are_independent() -> Result<()> {
        let store = InMemoryTokenStore::new();
        let now = Utc::now();
        assert!(
            store
                .insert(TokenKind::Reset, "abc", grant(now + Duration::hours(1)))
                .await?
        );
        assert!(store.find(TokenKind::Verification, "abc").await?.is_none());
        assert!(store
            .consume(TokenKind::Verification, "abc", now)
            .await?
            .is_none());
        assert!(store.consume(TokenKind::Reset, "abc", now).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn insert_refuses_existing_token() -> Result<()> {
        let store = InMemoryTokenStore::new();
        let expires = Utc::now() + Duration::hours(1);
        assert!(store.insert(TokenKind::Reset, "abc", grant(expires)).await?);
        assert!(!store.insert(TokenKind::Reset, "abc", grant(expires)).await?);
        assert!(
            store
                .insert(TokenKind::Verification, "abc", grant(expires))
                .await?
        );
        Ok(())
    }

    #[tokio::test]
    async fn consume_is_single_use() -> Result<()> {
        let store = InMemoryTokenStore::new();
        let now = Utc::now();
        store
            .insert(TokenKind::Reset, "abc", grant(now + Duration::hours(1)))
            .await?;
        assert!(store.consume(TokenKind::Reset, "abc", now).await?.is_some());
        assert!(store.consume(TokenKind::Reset, "abc", now).await?.is_none());
        assert!(store.find(TokenKind::Reset, "abc").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn consume_leaves_expired_grants_for_sweeper() -> Result<()> {
        let store = InMemoryTokenStore::new();
        let now = Utc::now();
        store.insert(TokenKind::Reset, "abc", grant(now)).await?;
        assert!(store.consume(TokenKind::Reset, "abc", now).await?.is_none());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.purge_expired(now).await?, 1);
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn purge_keeps_live_grants() -> Result<()> {
        let store = InMemoryTokenStore::new();
        let now = Utc::now();
        store
            .insert(TokenKind::Reset, "old", grant(now - Duration::seconds(1)))
            .await?;
        store
            .insert(
                TokenKind::Verification,
                "new",
                grant(now + Duration::hours(1)),
            )
            .await?;
        assert_eq!(store.purge_expired(now).await?, 1);
        assert!(store.find(TokenKind::Verification, "new").await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_consume_has_one_winner() -> Result<()> {
        let store = Arc::new(InMemoryTokenStore::new());
        let now = Utc::now();
        store
            .insert(TokenKind::Reset, "abc", grant(now + Duration::hours(1)))
            .await?;

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.consume(TokenKind::Reset, "abc", now).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await??.is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        Ok(())
    }
}
