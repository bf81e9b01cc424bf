//! API handlers for the credential service.
//!
//! Handlers validate request shape, call into [`crate::credentials::CredentialService`]
//! and translate its errors into HTTP responses.

pub mod auth;
pub mod health;
pub mod root;
