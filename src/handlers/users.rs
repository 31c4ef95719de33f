//! User, role, permission and audit-log administration endpoints.

use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::entities::user::UserStatus;
use crate::services::users::{AuditLogFilter, NewUser, UserUpdate};
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, patch, post, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserStatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RoleRequest {
    #[validate(length(min = 1, message = "Role name is required"))]
    pub role_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RolePermissionsRequest {
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuditLogQuery {
    pub user_id: Option<Uuid>,
    pub action_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}
fn default_per_page() -> u64 {
    50
}

fn parse_day_start(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ApiError::ValidationError(format!("Invalid date: {}", e)))?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ApiError::ValidationError("Invalid date".to_string()))
}

fn parse_day_end(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ApiError::ValidationError(format!("Invalid date: {}", e)))?
        .and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ApiError::ValidationError("Invalid date".to_string()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses((status = 200, description = "All users with role names")),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_USERS)?;
    let users = state
        .services
        .user_admin
        .list_users()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(users))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 409, description = "Username or email taken", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_USERS)?;
    validate_input(&payload)?;

    let status = payload
        .status
        .as_deref()
        .map(|raw| {
            UserStatus::parse(raw)
                .ok_or_else(|| ApiError::ValidationError(format!("Invalid status: {}", raw)))
        })
        .transpose()?;

    let created = state
        .services
        .user_admin
        .create_user(
            NewUser {
                username: payload.username,
                password: payload.password,
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                role_id: payload.role_id,
                status,
            },
            Some(user.user_id),
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(serde_json::json!({
        "success": true,
        "id": created.id
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User detail"),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_USERS)?;
    let found = state
        .services
        .user_admin
        .get_user(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(found))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    request_body = UpdateUserRequest,
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "User updated")),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_USERS)?;
    validate_input(&payload)?;
    state
        .services
        .user_admin
        .update_user(
            id,
            UserUpdate {
                name: payload.name,
                email: payload.email,
                phone: payload.phone,
                role_id: payload.role_id,
            },
            Some(user.user_id),
        )
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

/// Activate, deactivate or lock an account.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/status",
    request_body = UserStatusRequest,
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Status updated")),
    tag = "users"
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_USERS)?;
    validate_input(&payload)?;
    let status = UserStatus::parse(&payload.status)
        .ok_or_else(|| ApiError::ValidationError(format!("Invalid status: {}", payload.status)))?;
    state
        .services
        .user_admin
        .set_status(id, status, Some(user.user_id))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "success": true,
        "message": format!("User status updated to {}", status.as_str())
    })))
}

/// Admin password reset; unlocks the account and forces a change.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/reset-password",
    request_body = ResetPasswordRequest,
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Password reset")),
    tag = "users"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_USERS)?;
    validate_input(&payload)?;
    state
        .services
        .user_admin
        .reset_password(id, &payload.password, Some(user.user_id))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    responses((status = 200, description = "All roles")),
    tag = "users"
)]
pub async fn list_roles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_VIEW)?;
    let roles = state
        .services
        .user_admin
        .list_roles()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(roles))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    request_body = RoleRequest,
    responses((status = 201, description = "Role created")),
    tag = "users"
)]
pub async fn create_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<RoleRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_ROLES)?;
    validate_input(&payload)?;
    let created = state
        .services
        .user_admin
        .create_role(payload.role_name, payload.description, Some(user.user_id))
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": created.id
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    request_body = RoleRequest,
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Role updated")),
    tag = "users"
)]
pub async fn update_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_ROLES)?;
    validate_input(&payload)?;
    state
        .services
        .user_admin
        .update_role(id, payload.role_name, payload.description, Some(user.user_id))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    responses((status = 200, description = "Permission catalog")),
    tag = "users"
)]
pub async fn list_permissions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_VIEW)?;
    let permissions = state
        .services
        .user_admin
        .list_permissions()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(permissions))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}/permissions",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Permissions granted to the role")),
    tag = "users"
)]
pub async fn get_role_permissions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_ROLES)?;
    let permissions = state
        .services
        .user_admin
        .role_permissions(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(permissions))
}

/// Replace a role's permission set.
#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}/permissions",
    request_body = RolePermissionsRequest,
    params(("id" = Uuid, Path, description = "Role ID")),
    responses((status = 200, description = "Permissions replaced")),
    tag = "users"
)]
pub async fn set_role_permissions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RolePermissionsRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_MANAGE_ROLES)?;
    state
        .services
        .user_admin
        .set_role_permissions(id, payload.permission_ids, Some(user.user_id))
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    params(
        ("action_type" = Option<String>, Query, description = "Filter by action"),
        ("page" = Option<u64>, Query, description = "Page number"),
        ("per_page" = Option<u64>, Query, description = "Page size")
    ),
    responses((status = 200, description = "Paged audit trail", body = crate::services::users::AuditLogPage)),
    tag = "users"
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SETTINGS_VIEW_AUDIT_LOGS)?;

    let start_date = query.start_date.as_deref().map(parse_day_start).transpose()?;
    let end_date = query.end_date.as_deref().map(parse_day_end).transpose()?;

    let page = state
        .services
        .user_admin
        .audit_logs(AuditLogFilter {
            user_id: query.user_id,
            action_type: query.action_type,
            start_date,
            end_date,
            page: query.page,
            per_page: query.per_page,
        })
        .await
        .map_err(map_service_error)?;
    Ok(success_response(page))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user))
        .route("/:id/status", patch(update_user_status))
        .route("/:id/reset-password", post(reset_password))
}

pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", put(update_role))
        .route(
            "/:id/permissions",
            get(get_role_permissions).put(set_role_permissions),
        )
}

pub fn permission_routes() -> Router<AppState> {
    Router::new().route("/", get(list_permissions))
}

pub fn audit_log_routes() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}
