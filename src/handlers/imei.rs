//! IMEI tracking endpoints.

use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddSerialsRequest {
    #[validate(length(min = 1, message = "No serials supplied"))]
    pub serials: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImeiListQuery {
    /// available | sold (`in_stock` accepted as an alias of available)
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MarkSoldRequest {
    #[validate(length(min = 1, message = "No IMEIs supplied"))]
    pub imei_ids: Vec<Uuid>,
    pub sale_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MarkReturnedRequest {
    #[validate(length(min = 1, message = "No IMEIs supplied"))]
    pub imei_ids: Vec<Uuid>,
}

/// List a product's serials.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/imeis",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("status" = Option<String>, Query, description = "available | sold")
    ),
    responses((status = 200, description = "Serials for the product")),
    tag = "imei"
)]
pub async fn list_imeis(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(query): Query<ImeiListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW_IMEI)?;
    let imeis = state
        .services
        .imei
        .list_by_product(id, query.status.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(imeis))
}

/// Register serials for a product.
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/imeis",
    request_body = AddSerialsRequest,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 201, description = "Serials registered"),
        (status = 409, description = "Serial already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "imei"
)]
pub async fn add_serials(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddSerialsRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW_IMEI)?;
    validate_input(&payload)?;
    let created = state
        .services
        .imei
        .add_serials(id, payload.serials, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "added": created.len()
    })))
}

/// Check whether a serial exists and is available on a product.
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/imeis/{imei}/verify",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("imei" = String, Path, description = "Serial number")
    ),
    responses((status = 200, description = "Verification result", body = crate::services::imei::ImeiVerification)),
    tag = "imei"
)]
pub async fn verify_imei(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, imei)): Path<(Uuid, String)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW_IMEI)?;
    let verification = state
        .services
        .imei
        .verify(id, &imei)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(verification))
}

/// Explicitly mark serials sold against a sale.
#[utoipa::path(
    post,
    path = "/api/v1/imeis/mark-sold",
    request_body = MarkSoldRequest,
    responses(
        (status = 200, description = "Serials marked sold"),
        (status = 409, description = "Serial no longer available", body = crate::errors::ErrorResponse)
    ),
    tag = "imei"
)]
pub async fn mark_sold(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<MarkSoldRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW_IMEI)?;
    validate_input(&payload)?;
    state
        .services
        .imei
        .mark_sold(payload.imei_ids, payload.sale_id, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

/// Explicitly return serials to stock.
#[utoipa::path(
    post,
    path = "/api/v1/imeis/mark-returned",
    request_body = MarkReturnedRequest,
    responses(
        (status = 200, description = "Serials returned to stock"),
        (status = 409, description = "Serial was not sold", body = crate::errors::ErrorResponse)
    ),
    tag = "imei"
)]
pub async fn mark_returned(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<MarkReturnedRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW_IMEI)?;
    validate_input(&payload)?;
    state
        .services
        .imei
        .mark_returned(payload.imei_ids, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

/// Delete a serial. Sold serials are kept for audit integrity.
#[utoipa::path(
    delete,
    path = "/api/v1/imeis/{id}",
    params(("id" = Uuid, Path, description = "IMEI row ID")),
    responses(
        (status = 200, description = "Serial deleted"),
        (status = 400, description = "Serial has been sold", body = crate::errors::ErrorResponse)
    ),
    tag = "imei"
)]
pub async fn delete_imei(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_VIEW_IMEI)?;
    state
        .services
        .imei
        .delete(id, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

/// Routes mounted under /products (per-product serial operations).
pub fn product_imei_routes() -> Router<AppState> {
    Router::new()
        .route("/:id/imeis", get(list_imeis).post(add_serials))
        .route("/:id/imeis/:imei/verify", get(verify_imei))
}

/// Routes mounted under /imeis (serial-level operations).
pub fn imei_routes() -> Router<AppState> {
    Router::new()
        .route("/mark-sold", post(mark_sold))
        .route("/mark-returned", post(mark_returned))
        .route("/:id", delete(delete_imei))
}
