use crate::{
    api,
    credentials::{
        notify::{LogNotifier, Notifier, WebhookNotifier},
        spawn_token_sweeper,
        tokens::TokenStore,
        CredentialConfig, CredentialService,
    },
    storage::{
        seed::seed_demo_users, InMemoryTokenStore, InMemoryUserStore, PgTokenStore, PgUserStore,
        UserStore,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub jwt_secret: SecretString,
    pub frontend_base_url: String,
    pub token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub token_sweep_seconds: u64,
    pub notify_webhook_url: Option<String>,
    pub seed_demo_users: bool,
}

type Stores = (Arc<dyn UserStore>, Arc<dyn TokenStore>);

async fn stores(dsn: Option<&str>) -> Result<Stores> {
    let Some(dsn) = dsn else {
        warn!("No --dsn given, accounts and tokens are kept in memory");
        let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
        let tokens: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());
        return Ok((users, tokens));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let tokens: Arc<dyn TokenStore> = Arc::new(PgTokenStore::new(pool));
    Ok((users, tokens))
}

fn notifier(webhook_url: Option<String>) -> Result<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match webhook_url {
        Some(url) => {
            Arc::new(WebhookNotifier::new(url).context("Failed to build webhook notifier")?)
        }
        None => Arc::new(LogNotifier),
    };
    Ok(notifier)
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, seeding fails, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let (users, tokens) = stores(args.dsn.as_deref()).await?;

    if args.seed_demo_users {
        let created = seed_demo_users(users.as_ref(), args.bcrypt_cost)
            .await
            .context("Failed to seed demo users")?;
        info!("Seeded {created} demo users");
    }

    let config = CredentialConfig::new(args.frontend_base_url)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_bcrypt_cost(args.bcrypt_cost)
        .with_token_sweep_seconds(args.token_sweep_seconds);

    let service = Arc::new(CredentialService::new(
        config,
        &args.jwt_secret,
        users,
        tokens,
        notifier(args.notify_webhook_url)?,
    ));

    let sweeper = spawn_token_sweeper(service.clone());

    let result = api::new(args.port, service).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    result
}
