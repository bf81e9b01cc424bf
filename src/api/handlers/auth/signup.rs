use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::{ErrorResponse, SignUpRequest};
use super::{bad_request, validate, MISSING_PAYLOAD};
use crate::credentials::{AuthPayload, CredentialService};

/// Create an account and return a session; a verification link is emailed.
#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created", body = AuthPayload),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    service: Extension<Arc<CredentialService>>,
    payload: Option<Json<SignUpRequest>>,
) -> impl IntoResponse {
    let request: SignUpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request(MISSING_PAYLOAD),
    };

    if let Err(message) = validate::email(&request.email)
        .and_then(|()| validate::name(&request.name))
        .and_then(|()| validate::new_password(&request.password))
    {
        return bad_request(message);
    }

    match service
        .sign_up(&request.email, &request.name, &request.password)
        .await
    {
        Ok(payload) => (StatusCode::CREATED, Json(payload)).into_response(),
        Err(err) => err.into_response(),
    }
}
