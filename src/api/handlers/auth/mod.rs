//! Credential lifecycle endpoints under `/v1/auth`.
//!
//! Every handler checks the request shape first, then hands normalized input to
//! the credential service. Domain errors map onto a fixed status and a stable
//! `{"error": ...}` body so clients never see internals.

pub mod login;
pub mod password;
pub mod session;
pub mod signup;
pub mod types;
mod validate;
pub mod verification;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::credentials::CredentialError;
use types::ErrorResponse;

pub(crate) const MISSING_PAYLOAD: &str = "Missing payload";
const INTERNAL_ERROR: &str = "Internal server error";

pub(crate) fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn bad_request(message: &str) -> Response {
    error_body(StatusCode::BAD_REQUEST, message)
}

pub(crate) fn status_for(err: &CredentialError) -> StatusCode {
    match err {
        CredentialError::DuplicateAccount => StatusCode::CONFLICT,
        CredentialError::InvalidCredentials | CredentialError::InvalidSession => {
            StatusCode::UNAUTHORIZED
        }
        CredentialError::InvalidOrExpiredToken(_) => StatusCode::BAD_REQUEST,
        CredentialError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for CredentialError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if let Self::Internal(err) = &self {
            error!("credential operation failed: {err:#}");
            return error_body(status, INTERNAL_ERROR);
        }
        error_body(status, &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::tokens::TokenKind;
    use anyhow::{anyhow, Result};
    use axum::body::to_bytes;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            status_for(&CredentialError::DuplicateAccount),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&CredentialError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&CredentialError::InvalidSession),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&CredentialError::InvalidOrExpiredToken(TokenKind::Reset)),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn internal_errors_are_not_leaked() -> Result<()> {
        let response =
            CredentialError::Internal(anyhow!("connection refused to 10.0.0.3")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(value["error"], INTERNAL_ERROR);
        Ok(())
    }
}
