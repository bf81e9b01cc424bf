//! Map validated CLI matches to an action.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, notify, ARG_DSN, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .filter(|v| !v.trim().is_empty());

    let auth_opts = auth::Options::parse(matches)?;
    let notify_opts = notify::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret: auth_opts.jwt_secret,
        frontend_base_url: auth_opts.frontend_base_url,
        token_ttl_seconds: auth_opts.token_ttl_seconds,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        bcrypt_cost: auth_opts.bcrypt_cost,
        token_sweep_seconds: auth_opts.token_sweep_seconds,
        notify_webhook_url: notify_opts.webhook_url,
        seed_demo_users: auth_opts.seed_demo_users,
    }))
}
