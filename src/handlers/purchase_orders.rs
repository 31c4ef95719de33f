use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::entities::purchase_order::PaymentStatus;
use crate::services::procurement::{
    NewPurchaseOrder, NewPurchaseOrderItem, ReceiveLine, ReceiveRequest,
};
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    #[validate(length(min = 1, message = "PO number is required"))]
    pub po_number: String,
    #[validate(length(min = 1, message = "Supplier name is required"))]
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    /// YYYY-MM-DD
    #[validate(length(min = 1, message = "Order date is required"))]
    pub order_date: String,
    pub expected_delivery: Option<String>,
    #[serde(default)]
    pub total_amount: f64,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct PurchaseOrderItemRequest {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Product name is required"))]
    pub product_name: String,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(range(min = 0.0))]
    pub cost_price: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceivePurchaseOrderRequest {
    pub payment_status: Option<String>,
    pub storage_location: Option<String>,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub items: Vec<ReceiveItemRequest>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct ReceiveItemRequest {
    pub po_item_id: Uuid,
    #[serde(default)]
    pub received_quantity: i32,
    #[serde(default)]
    pub damaged_quantity: i32,
    pub damage_reason: Option<String>,
    #[serde(default)]
    pub imei_numbers: Vec<String>,
}

fn parse_date(raw: &str, label: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ApiError::ValidationError(format!("Invalid {} date: {}", label, e)))
}

/// Create a purchase order with line items.
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created"),
        (status = 409, description = "PO number already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::PURCHASE_CREATE)?;
    validate_input(&payload)?;

    let order_date = parse_date(&payload.order_date, "order")?;
    let expected_delivery = payload
        .expected_delivery
        .as_deref()
        .map(|raw| parse_date(raw, "delivery"))
        .transpose()?;

    let items = payload
        .items
        .into_iter()
        .map(|item| NewPurchaseOrderItem {
            product_id: item.product_id,
            product_name: item.product_name,
            category_id: item.category_id,
            brand_id: item.brand_id,
            model_id: item.model_id,
            quantity: item.quantity,
            cost_price: item.cost_price,
        })
        .collect();

    let order = state
        .services
        .procurement
        .create_purchase_order(
            NewPurchaseOrder {
                po_number: payload.po_number,
                supplier_name: payload.supplier_name,
                supplier_contact: payload.supplier_contact,
                order_date,
                expected_delivery,
                total_amount: payload.total_amount,
                notes: payload.notes,
                items,
            },
            &user.username,
        )
        .await
        .map_err(map_service_error)?;

    Ok(created_response(serde_json::json!({
        "success": true,
        "id": order.id
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses((status = 200, description = "All purchase orders, newest first")),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::PURCHASE_VIEW)?;
    let orders = state
        .services
        .procurement
        .list_purchase_orders()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order with items", body = crate::services::procurement::PurchaseOrderDetail),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::PURCHASE_VIEW)?;
    let detail = state
        .services
        .procurement
        .get_purchase_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

/// Post a receipt against a purchase order, generating a GRN.
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    request_body = ReceivePurchaseOrderRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Receipt posted", body = crate::services::procurement::ReceiveOutcome),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate serial", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReceivePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::PURCHASE_RECEIVE)?;
    validate_input(&payload)?;

    let payment_status = payload
        .payment_status
        .as_deref()
        .map(|raw| {
            PaymentStatus::parse(raw).ok_or_else(|| {
                ApiError::ValidationError(format!("Invalid payment status: {}", raw))
            })
        })
        .transpose()?;

    let items = payload
        .items
        .into_iter()
        .map(|item| ReceiveLine {
            po_item_id: item.po_item_id,
            received_quantity: item.received_quantity,
            damaged_quantity: item.damaged_quantity,
            damage_reason: item.damage_reason,
            imei_numbers: item.imei_numbers,
        })
        .collect();

    let outcome = state
        .services
        .procurement
        .receive_purchase_order(
            id,
            ReceiveRequest {
                payment_status,
                storage_location: payload.storage_location,
                items,
            },
            &user.username,
        )
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "success": true,
        "message": "Items received successfully",
        "grn_id": outcome.grn_id,
        "grn_number": outcome.grn_number,
        "status": outcome.status,
        "total_ordered": outcome.total_ordered,
        "total_received": outcome.total_received,
        "damaged_count": outcome.damaged_count
    })))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route("/:id", get(get_purchase_order))
        .route("/:id/receive", post(receive_purchase_order))
}
