//! Demo accounts for local development.

use anyhow::Result;
use tracing::info;

use super::{CreateOutcome, NewUser, UserStore};
use crate::credentials::password::hash_password;

struct SeedUser {
    email: &'static str,
    name: &'static str,
    password: &'static str,
}

const SEED_USERS: &[SeedUser] = &[
    SeedUser {
        email: "test@example.com",
        name: "Test User",
        password: "password123",
    },
    SeedUser {
        email: "admin@example.com",
        name: "Admin User",
        password: "admin123",
    },
];

/// Create the demo accounts (already verified) unless they exist.
/// Returns how many were created.
///
/// # Errors
/// Returns an error if hashing or the store fails.
pub async fn seed_demo_users(store: &dyn UserStore, bcrypt_cost: u32) -> Result<usize> {
    let mut created = 0;
    for seed in SEED_USERS {
        let email = seed.email.to_lowercase();
        if store.find_by_email(&email).await?.is_some() {
            info!("seed user already exists: {email}");
            continue;
        }

        let password_hash = hash_password(seed.password, bcrypt_cost).await?;
        let outcome = store
            .create(NewUser {
                email: email.clone(),
                name: seed.name.to_string(),
                password_hash,
                email_verified: true,
            })
            .await?;

        match outcome {
            CreateOutcome::Created(_) => {
                info!("created seed user: {email}");
                created += 1;
            }
            CreateOutcome::Conflict => info!("seed user already exists: {email}"),
        }
    }
    Ok(created)
}
