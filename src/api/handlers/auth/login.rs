use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::{ErrorResponse, LoginRequest};
use super::{bad_request, validate, MISSING_PAYLOAD};
use crate::credentials::{AuthPayload, CredentialService};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthPayload),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    service: Extension<Arc<CredentialService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request(MISSING_PAYLOAD),
    };

    if let Err(message) = validate::email(&request.email)
        .and_then(|()| validate::password_present(&request.password))
    {
        return bad_request(message);
    }

    match service.login(&request.email, &request.password).await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => err.into_response(),
    }
}
