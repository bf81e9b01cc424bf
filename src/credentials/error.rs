//! Domain failures reported by the credential service.

use thiserror::Error;

use super::tokens::TokenKind;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("User with this email already exists")]
    DuplicateAccount,

    /// Same error for a missing account and a wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Covers unknown, expired, already consumed, and tokens whose user vanished.
    #[error("Invalid or expired {0} token")]
    InvalidOrExpiredToken(TokenKind),

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_name_their_namespace() {
        assert_eq!(
            CredentialError::InvalidOrExpiredToken(TokenKind::Reset).to_string(),
            "Invalid or expired reset token"
        );
        assert_eq!(
            CredentialError::InvalidOrExpiredToken(TokenKind::Verification).to_string(),
            "Invalid or expired verification token"
        );
    }

    #[test]
    fn internal_wraps_anyhow() {
        let err: CredentialError = anyhow::anyhow!("pool closed").into();
        assert!(matches!(err, CredentialError::Internal(_)));
        assert_eq!(err.to_string(), "pool closed");
    }
}
