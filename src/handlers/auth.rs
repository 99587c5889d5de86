use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created_response, success_response};
use crate::{
    auth::{AuthUser, TokenPair},
    errors::ServiceError,
    services::accounts::{LoginRequest, LoginResponse, RegisterRequest, UserProfile},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    summary = "Register",
    description = "Create a customer account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid registration data", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let profile = state.services.accounts.register(request).await?;
    Ok(created_response(profile))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    summary = "Login",
    description = "Exchange email and password for an access/refresh token pair",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account deactivated", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = state.services.accounts.login(request).await?;
    Ok(success_response(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    summary = "Refresh tokens",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = ApiResponse<TokenPair>),
        (status = 401, description = "Invalid or revoked refresh token", body = crate::errors::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<TokenPair> {
    request.validate()?;
    let tokens = state.auth.refresh_token(&request.refresh_token).await?;
    Ok(success_response(tokens))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    summary = "Logout",
    description = "Revoke the presented access token",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ServiceError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))?;
    state.auth.revoke_token(token).await?;
    info!(user_id = %user.user_id, "User logged out");
    Ok(super::common::no_content_response())
}
