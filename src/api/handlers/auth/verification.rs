//! Email verification endpoint.

use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::{ErrorResponse, VerifyEmailRequest};
use super::{bad_request, validate, MISSING_PAYLOAD};
use crate::credentials::{Ack, CredentialService};

/// Verify the email link by consuming the single-use token.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = Ack),
        (status = 400, description = "Missing or invalid/expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    service: Extension<Arc<CredentialService>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> impl IntoResponse {
    let request: VerifyEmailRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request(MISSING_PAYLOAD),
    };

    let token = match validate::token(&request.token) {
        Ok(token) => token,
        Err(message) => return bad_request(message),
    };

    match service.verify_email(token).await {
        Ok(ack) => Json(ack).into_response(),
        Err(err) => err.into_response(),
    }
}
