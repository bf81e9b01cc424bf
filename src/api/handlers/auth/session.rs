use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::types::ErrorResponse;
use crate::credentials::{CredentialError, CredentialService, PublicUser};

/// Pull the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Return the user behind the bearer session.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(
    headers: HeaderMap,
    service: Extension<Arc<CredentialService>>,
) -> impl IntoResponse {
    let Some(access_token) = bearer_token(&headers) else {
        return CredentialError::InvalidSession.into_response();
    };

    match service.authenticate(access_token).await {
        Ok(user) => Json(user).into_response(),
        Err(err) => err.into_response(),
    }
}
