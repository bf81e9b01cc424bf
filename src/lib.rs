//! # Keyward (credential lifecycle service)
//!
//! `keyward` owns the secret-handling half of a user account: password hashing,
//! signed sessions, and the single-use tokens behind password reset and email
//! verification.
//!
//! ## Tokens
//!
//! Reset and verification tokens live in separate namespaces; a token of one kind
//! never satisfies the other operation. Tokens are 32 random bytes, hex-encoded,
//! valid for one hour, and consumed exactly once through an atomic
//! check-and-delete. Expiry is evaluated lazily when a token is presented.
//!
//! ## Account enumeration
//!
//! Login failures return the same error whether the account is missing or the
//! password is wrong, and forgot-password always acknowledges with the same
//! message.

pub mod api;
pub mod cli;
pub mod credentials;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
