//! Category, brand and device-model endpoints.

use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NameDescriptionRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeviceModelRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub brand_id: Uuid,
    pub description: Option<String>,
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct DeviceModelView {
    #[serde(flatten)]
    pub model: crate::entities::device_model::Model,
    pub brand_name: Option<String>,
}

// -- categories --------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "All categories")),
    tag = "catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW)?;
    let categories = state
        .services
        .catalog
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = NameDescriptionRequest,
    responses(
        (status = 201, description = "Category created"),
        (status = 409, description = "Category already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NameDescriptionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_ADD_PRODUCT)?;
    validate_input(&payload)?;
    let created = state
        .services
        .catalog
        .create_category(payload.name, payload.description, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": created.id
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    request_body = NameDescriptionRequest,
    params(("id" = Uuid, Path, description = "Category ID")),
    responses((status = 200, description = "Category updated")),
    tag = "catalog"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NameDescriptionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_EDIT_PRODUCT)?;
    validate_input(&payload)?;
    state
        .services
        .catalog
        .update_category(id, payload.name, payload.description)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 400, description = "Category has associated products", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_DELETE_PRODUCT)?;
    state
        .services
        .catalog
        .delete_category(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

// -- brands ------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/brands",
    responses((status = 200, description = "All brands")),
    tag = "catalog"
)]
pub async fn list_brands(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW)?;
    let brands = state
        .services
        .catalog
        .list_brands()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(brands))
}

#[utoipa::path(
    post,
    path = "/api/v1/brands",
    request_body = NameDescriptionRequest,
    responses((status = 201, description = "Brand created")),
    tag = "catalog"
)]
pub async fn create_brand(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<NameDescriptionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_ADD_PRODUCT)?;
    validate_input(&payload)?;
    let created = state
        .services
        .catalog
        .create_brand(payload.name, payload.description, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": created.id
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/brands/{id}",
    request_body = NameDescriptionRequest,
    params(("id" = Uuid, Path, description = "Brand ID")),
    responses((status = 200, description = "Brand updated")),
    tag = "catalog"
)]
pub async fn update_brand(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<NameDescriptionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_EDIT_PRODUCT)?;
    validate_input(&payload)?;
    state
        .services
        .catalog
        .update_brand(id, payload.name, payload.description)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/brands/{id}",
    params(("id" = Uuid, Path, description = "Brand ID")),
    responses((status = 200, description = "Brand deleted")),
    tag = "catalog"
)]
pub async fn delete_brand(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_DELETE_PRODUCT)?;
    state
        .services
        .catalog
        .delete_brand(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

// -- device models -----------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/models",
    responses((status = 200, description = "All device models with brand names")),
    tag = "catalog"
)]
pub async fn list_models(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW)?;
    let models = state
        .services
        .catalog
        .list_device_models()
        .await
        .map_err(map_service_error)?;
    let views: Vec<DeviceModelView> = models
        .into_iter()
        .map(|(model, brand_name)| DeviceModelView { model, brand_name })
        .collect();
    Ok(success_response(views))
}

#[utoipa::path(
    post,
    path = "/api/v1/models",
    request_body = DeviceModelRequest,
    responses((status = 201, description = "Model created")),
    tag = "catalog"
)]
pub async fn create_model(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<DeviceModelRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_ADD_PRODUCT)?;
    validate_input(&payload)?;
    let created = state
        .services
        .catalog
        .create_device_model(payload.name, payload.brand_id, payload.description)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": created.id
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/models/{id}",
    request_body = DeviceModelRequest,
    params(("id" = Uuid, Path, description = "Model ID")),
    responses((status = 200, description = "Model updated")),
    tag = "catalog"
)]
pub async fn update_model(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeviceModelRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_EDIT_PRODUCT)?;
    validate_input(&payload)?;
    state
        .services
        .catalog
        .update_device_model(id, payload.name, payload.brand_id, payload.description)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/models/{id}",
    params(("id" = Uuid, Path, description = "Model ID")),
    responses((status = 200, description = "Model deleted")),
    tag = "catalog"
)]
pub async fn delete_model(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_DELETE_PRODUCT)?;
    state
        .services
        .catalog
        .delete_device_model(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            put(update_category).delete(delete_category),
        )
        .route("/brands", get(list_brands).post(create_brand))
        .route("/brands/:id", put(update_brand).delete(delete_brand))
        .route("/models", get(list_models).post(create_model))
        .route("/models/:id", put(update_model).delete(delete_model))
}
