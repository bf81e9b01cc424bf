use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

use crate::credentials::{
    config::MAX_TTL_SECONDS, password::BCRYPT_COST, session::DEFAULT_SESSION_TTL_SECONDS,
    tokens::DEFAULT_TOKEN_TTL_SECONDS,
};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";
pub const ARG_TOKEN_SWEEP_SECONDS: &str = "token-sweep-seconds";
pub const ARG_SEED_DEMO_USERS: &str = "seed-demo-users";

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: SecretString,
    pub frontend_base_url: String,
    pub token_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub token_sweep_seconds: u64,
    pub seed_demo_users: bool,
}

impl Options {
    /// Parse credential arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the signing secret is missing or blank.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let jwt_secret = matches
            .get_one::<String>(ARG_JWT_SECRET)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_JWT_SECRET}"))?;

        Ok(Self {
            jwt_secret: SecretString::from(jwt_secret),
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            token_ttl_seconds: matches
                .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(BCRYPT_COST),
            token_sweep_seconds: matches
                .get_one::<u64>(ARG_TOKEN_SWEEP_SECONDS)
                .copied()
                .unwrap_or(300),
            seed_demo_users: matches.get_flag(ARG_SEED_DEMO_USERS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_token_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens (HS256)")
                .env("KEYWARD_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("KEYWARD_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor for new password hashes")
                .env("KEYWARD_BCRYPT_COST")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(4..=31)),
        )
        .arg(
            Arg::new(ARG_SEED_DEMO_USERS)
                .long(ARG_SEED_DEMO_USERS)
                .help("Create the verified demo accounts on startup if missing")
                .env("KEYWARD_SEED_DEMO_USERS")
                .action(ArgAction::SetTrue),
        )
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for verification and reset links")
                .env("KEYWARD_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Reset and verification token TTL in seconds")
                .env("KEYWARD_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_TOKEN_SWEEP_SECONDS)
                .long(ARG_TOKEN_SWEEP_SECONDS)
                .help("Interval for purging expired tokens, 0 disables the sweeper")
                .env("KEYWARD_TOKEN_SWEEP_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}
