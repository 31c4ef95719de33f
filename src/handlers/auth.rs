use super::common::{map_service_error, success_response, validate_input};
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WhoAmI {
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

/// Authenticate with username/password and receive a token pair.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = crate::auth::LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
        (status = 403, description = "Account locked or inactive", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let response = state
        .auth_service
        .login(&payload.username, &payload.password)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(response))
}

/// Exchange a refresh token for a fresh pair.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = crate::auth::TokenPair),
        (status = 401, description = "Invalid refresh token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let tokens = state
        .auth_service
        .refresh(&payload.refresh_token)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(tokens))
}

/// Identity and permissions of the presented token.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current identity", body = WhoAmI),
        (status = 401, description = "Not authenticated", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn me(user: AuthenticatedUser) -> Result<impl axum::response::IntoResponse, ApiError> {
    Ok(success_response(WhoAmI {
        username: user.username,
        role: user.role,
        permissions: user.permissions,
    }))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
}

pub fn auth_me_routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}
