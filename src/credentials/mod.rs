//! Credential service and its collaborators.

pub mod clock;
pub mod config;
mod error;
pub mod notify;
pub mod password;
mod service;
pub mod session;
pub mod tokens;
mod types;

pub use config::CredentialConfig;
pub use error::{CredentialError, CredentialResult};
pub use service::{
    normalize_email, spawn_token_sweeper, CredentialService, EMAIL_VERIFIED_MESSAGE,
    FORGOT_PASSWORD_MESSAGE, PASSWORD_CHANGED_MESSAGE, PASSWORD_RESET_MESSAGE,
};
pub use types::{Ack, AuthPayload, PublicUser};
