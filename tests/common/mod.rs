#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use keyward::{
    credentials::{
        clock::ManualClock,
        notify::{Notification, Notifier, Template},
        CredentialConfig, CredentialService,
    },
    storage::{InMemoryTokenStore, InMemoryUserStore},
};
use secrecy::SecretString;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub const FRONTEND: &str = "http://localhost:5173";

/// Keeps every notification so tests can lift tokens out of the links.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, notification: &Notification) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("outbox lock poisoned"))?
            .push(notification.clone());
        Ok(())
    }
}

impl Outbox {
    /// Notifications are sent from spawned tasks, so poll briefly.
    pub async fn latest(&self, template: Template) -> Result<Notification> {
        for _ in 0..50 {
            let found = self
                .sent
                .lock()
                .map_err(|_| anyhow!("outbox lock poisoned"))?
                .iter()
                .rev()
                .find(|n| n.template == template)
                .cloned();
            if let Some(notification) = found {
                return Ok(notification);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Err(anyhow!("no {template:?} notification"))
    }

    pub async fn token(&self, template: Template) -> Result<String> {
        let notification = self.latest(template).await?;
        notification
            .link
            .split("token=")
            .nth(1)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("link without token: {}", notification.link))
    }

    pub fn count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or(0)
    }
}

pub struct TestApp {
    pub service: Arc<CredentialService>,
    pub users: Arc<InMemoryUserStore>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub outbox: Arc<Outbox>,
    pub clock: Arc<ManualClock>,
}

pub fn test_app() -> TestApp {
    let users = Arc::new(InMemoryUserStore::new());
    let tokens = Arc::new(InMemoryTokenStore::new());
    let outbox = Arc::new(Outbox::default());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let config = CredentialConfig::new(FRONTEND.to_string()).with_bcrypt_cost(4);
    let service = CredentialService::new(
        config,
        &SecretString::from("integration-secret".to_string()),
        users.clone(),
        tokens.clone(),
        outbox.clone(),
    )
    .with_clock(clock.clone());

    TestApp {
        service: Arc::new(service),
        users,
        tokens,
        outbox,
        clock,
    }
}
