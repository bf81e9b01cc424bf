//! Out-of-band delivery of verification and reset links.
//!
//! The credential service hands each message to a `Notifier` inside a spawned
//! task and never waits for it. Delivery failures are logged and dropped; any
//! retry policy belongs to whatever sits behind the notifier (a mail relay, a
//! queue, etc.).
//!
//! The default notifier for local dev is `LogNotifier`, which logs the link and
//! returns `Ok(())`. `WebhookNotifier` POSTs the message as JSON to a relay.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, Instrument};
use url::Url;

use crate::APP_USER_AGENT;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    VerifyEmail,
    ResetPassword,
}

#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub to: String,
    pub template: Template,
    pub link: String,
}

/// Delivery abstraction for account emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message or return an error describing why it failed.
    async fn send(&self, notification: &Notification) -> Result<()>;
}

/// Local dev notifier that logs the link instead of sending email.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(
            to = %notification.to,
            template = ?notification.template,
            link = %notification.link,
            "notification send stub"
        );
        Ok(())
    }
}

/// Posts each message to a mail relay endpoint.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self> {
        let url = Url::parse(&url).with_context(|| format!("invalid notification URL: {url}"))?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build notification client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(notification)
            .send()
            .await
            .with_context(|| format!("failed to reach notification relay {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} - {}", self.url, status));
        }

        Ok(())
    }
}

/// Send without blocking the caller. Errors are logged, never returned.
pub fn dispatch(
    notifier: Arc<dyn Notifier>,
    notification: Notification,
) -> tokio::task::JoinHandle<()> {
    let span = tracing::info_span!("notify", template = ?notification.template);
    tokio::spawn(
        async move {
            if let Err(err) = notifier.send(&notification).await {
                error!("failed to send {:?} notification: {err:#}", notification.template);
            }
        }
        .instrument(span),
    )
}

/// Build the frontend link for a token, e.g. `https://app.tld/verify-email?token=...`.
#[must_use]
pub fn build_link(frontend_base_url: &str, path: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/{path}?token={token}")
}
