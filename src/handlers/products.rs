//! Product endpoints: CRUD, filtering, bulk operations, stock history and
//! adjustments.

use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::entities::product::ProductStatus;
use crate::services::catalog::{BulkProductUpdate, NewProduct, ProductFilter, ProductUpdate};
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProductRequest {
    pub sku: Option<String>,
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub description: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub cost_price: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub selling_price: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub mrp: f64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub opening_stock: i32,
    /// Only honored on update; a change synthesizes a corrective adjustment.
    pub current_stock: Option<i32>,
    #[serde(default = "default_min_stock")]
    pub min_stock_level: i32,
    pub storage_location: Option<String>,
    pub color: Option<String>,
    pub storage_capacity: Option<String>,
    pub ram: Option<String>,
    pub warranty_period: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub status: Option<String>,
}

fn default_min_stock() -> i32 {
    10
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkIdsRequest {
    #[validate(length(min = 1, message = "No ids supplied"))]
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BulkUpdateRequest {
    #[validate(length(min = 1, message = "No ids supplied"))]
    pub ids: Vec<Uuid>,
    pub updates: BulkProductUpdate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StockAdjustmentRequest {
    /// Signed quantity; positive adds stock, negative removes it.
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DamageRequest {
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub reason: Option<String>,
}

fn parse_status(raw: Option<String>) -> Result<ProductStatus, ApiError> {
    match raw {
        None => Ok(ProductStatus::Active),
        Some(raw) => ProductStatus::parse(&raw)
            .ok_or_else(|| ApiError::ValidationError(format!("Invalid status: {}", raw))),
    }
}

/// List products with search and filters.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(
        ("search" = Option<String>, Query, description = "Match name, SKU or description"),
        ("stock_status" = Option<String>, Query, description = "low | out")
    ),
    responses((status = 200, description = "Filtered products")),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filter): Query<ProductFilter>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW)?;
    let products = state
        .services
        .catalog
        .list_products(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

/// Create a product. Positive opening stock seeds the movement ledger.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_ADD_PRODUCT)?;
    validate_input(&payload)?;
    let status = parse_status(payload.status)?;

    let created = state
        .services
        .catalog
        .create_product(
            NewProduct {
                sku: payload.sku,
                name: payload.name,
                category_id: payload.category_id,
                brand_id: payload.brand_id,
                model_id: payload.model_id,
                description: payload.description,
                cost_price: payload.cost_price,
                selling_price: payload.selling_price,
                mrp: payload.mrp,
                opening_stock: payload.opening_stock,
                min_stock_level: payload.min_stock_level,
                storage_location: payload.storage_location,
                color: payload.color,
                storage_capacity: payload.storage_capacity,
                ram: payload.ram,
                warranty_period: payload.warranty_period,
                supplier_name: payload.supplier_name,
                supplier_contact: payload.supplier_contact,
                status,
            },
            &user.username,
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
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product detail"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW)?;
    let found = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(found))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = ProductRequest,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Product updated")),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_EDIT_PRODUCT)?;
    validate_input(&payload)?;
    let status = parse_status(payload.status)?;

    state
        .services
        .catalog
        .update_product(
            id,
            ProductUpdate {
                sku: payload.sku,
                name: payload.name,
                category_id: payload.category_id,
                brand_id: payload.brand_id,
                model_id: payload.model_id,
                description: payload.description,
                cost_price: payload.cost_price,
                selling_price: payload.selling_price,
                mrp: payload.mrp,
                current_stock: payload.current_stock,
                min_stock_level: payload.min_stock_level,
                storage_location: payload.storage_location,
                color: payload.color,
                storage_capacity: payload.storage_capacity,
                ram: payload.ram,
                warranty_period: payload.warranty_period,
                supplier_name: payload.supplier_name,
                supplier_contact: payload.supplier_contact,
                status,
            },
            &user.username,
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Product deleted")),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_DELETE_PRODUCT)?;
    state
        .services
        .catalog
        .delete_product(id, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

/// Delete many products at once.
#[utoipa::path(
    post,
    path = "/api/v1/products/bulk-delete",
    request_body = BulkIdsRequest,
    responses((status = 200, description = "Products deleted")),
    tag = "products"
)]
pub async fn bulk_delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<BulkIdsRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_DELETE_PRODUCT)?;
    validate_input(&payload)?;
    let deleted = state
        .services
        .catalog
        .bulk_delete_products(payload.ids, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "success": true,
        "deleted": deleted
    })))
}

/// Apply a field subset to many products at once.
#[utoipa::path(
    post,
    path = "/api/v1/products/bulk-update",
    request_body = BulkUpdateRequest,
    responses((status = 200, description = "Products updated")),
    tag = "products"
)]
pub async fn bulk_update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<BulkUpdateRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_EDIT_PRODUCT)?;
    validate_input(&payload)?;
    let updated = state
        .services
        .catalog
        .bulk_update_products(payload.ids, payload.updates, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "success": true,
        "updated": updated
    })))
}

/// Chronological stock history with running balance.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/stock-history",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Running-balance history", body = crate::services::stock::StockHistory),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn stock_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW)?;
    let history = state
        .services
        .stock
        .stock_history(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(history))
}

/// Manual signed stock adjustment.
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/adjust-stock",
    request_body = StockAdjustmentRequest,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Stock adjusted"),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StockAdjustmentRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_STOCK_ADJUSTMENT)?;
    let movement = state
        .services
        .stock
        .adjust_stock(id, payload.quantity, payload.notes, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "success": true,
        "movement_id": movement.id
    })))
}

/// Write off damaged units.
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/damage",
    request_body = DamageRequest,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses((status = 200, description = "Damage recorded")),
    tag = "products"
)]
pub async fn record_damage(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DamageRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_STOCK_ADJUSTMENT)?;
    validate_input(&payload)?;
    let movement = state
        .services
        .stock
        .record_damage(id, payload.quantity, payload.reason, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "success": true,
        "movement_id": movement.id
    })))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/bulk-delete", post(bulk_delete))
        .route("/bulk-update", post(bulk_update))
        .route("/:id/stock-history", get(stock_history))
        .route("/:id/adjust-stock", post(adjust_stock))
        .route("/:id/damage", post(record_damage))
}
