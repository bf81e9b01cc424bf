//! Password recovery and rotation endpoints.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use std::sync::Arc;

use super::session::bearer_token;
use super::types::{
    ChangePasswordRequest, ErrorResponse, ForgotPasswordRequest, ResetPasswordRequest,
};
use super::{bad_request, validate, MISSING_PAYLOAD};
use crate::credentials::{Ack, CredentialError, CredentialService};

/// Request a reset link. The response is identical whether or not the account exists.
#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Request accepted", body = Ack),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    service: Extension<Arc<CredentialService>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request(MISSING_PAYLOAD),
    };

    if let Err(message) = validate::email(&request.email) {
        return bad_request(message);
    }

    Json(service.forgot_password(&request.email).await).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = Ack),
        (status = 400, description = "Invalid input or invalid/expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    service: Extension<Arc<CredentialService>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request(MISSING_PAYLOAD),
    };

    let token = match validate::token(&request.token) {
        Ok(token) => token,
        Err(message) => return bad_request(message),
    };
    if let Err(message) = validate::new_password(&request.new_password) {
        return bad_request(message);
    }

    match service.reset_password(token, &request.new_password).await {
        Ok(ack) => Json(ack).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = Ack),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid session or current password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn change_password(
    headers: HeaderMap,
    service: Extension<Arc<CredentialService>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> impl IntoResponse {
    let Some(access_token) = bearer_token(&headers) else {
        return CredentialError::InvalidSession.into_response();
    };

    let request: ChangePasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request(MISSING_PAYLOAD),
    };

    if let Err(message) = validate::password_present(&request.current_password)
        .and_then(|()| validate::new_password(&request.new_password))
    {
        return bad_request(message);
    }

    match service
        .change_password(access_token, &request.current_password, &request.new_password)
        .await
    {
        Ok(ack) => Json(ack).into_response(),
        Err(err) => err.into_response(),
    }
}
