//! Point-of-sale endpoints.

use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::entities::pos_sale::TransactionType;
use crate::services::pos::{PosCustomer, PosLine, PosRequest};
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PosTransactionRequest {
    /// sale | return | exchange
    #[validate(length(min = 1, message = "Transaction type is required"))]
    pub transaction_type: String,
    pub customer: Option<PosCustomerRequest>,
    #[validate(length(min = 1, message = "At least one line item is required"))]
    pub items: Vec<PosLineRequest>,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub tax_percent: f64,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub original_sale_id: Option<Uuid>,
    pub notes: Option<String>,
}

fn default_payment_method() -> String {
    "cash".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PosCustomerRequest {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct PosLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(range(min = 0.0))]
    pub unit_price: f64,
    /// Pre-existing inventory serials, selected by row id.
    #[serde(default)]
    pub imei_ids: Vec<Uuid>,
    /// Freshly entered serials; enter inventory already sold.
    #[serde(default)]
    pub new_serials: Vec<String>,
}

/// Record a sale, return or exchange.
#[utoipa::path(
    post,
    path = "/api/v1/pos/transactions",
    request_body = PosTransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = crate::services::pos::SaleDetail),
        (status = 409, description = "IMEI race lost", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "pos"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<PosTransactionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let transaction_type = TransactionType::parse(&payload.transaction_type).ok_or_else(|| {
        ApiError::ValidationError(format!(
            "Invalid transaction type: {}",
            payload.transaction_type
        ))
    })?;

    let required = match transaction_type {
        TransactionType::Sale | TransactionType::Exchange => perm::POS_CREATE_SALE,
        TransactionType::Return => perm::POS_PROCESS_RETURNS,
    };
    require_permission(&user, required)?;
    if payload.discount_percent > 0.0 {
        require_permission(&user, perm::POS_APPLY_DISCOUNTS)?;
    }

    let request = PosRequest {
        transaction_type,
        customer: payload.customer.map(|c| PosCustomer {
            name: c.name,
            phone: c.phone,
            email: c.email,
        }),
        items: payload
            .items
            .into_iter()
            .map(|line| PosLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                imei_ids: line.imei_ids,
                new_serials: line.new_serials,
            })
            .collect(),
        discount_percent: payload.discount_percent,
        tax_percent: payload.tax_percent,
        payment_method: payload.payment_method,
        original_sale_id: payload.original_sale_id,
        notes: payload.notes,
    };

    let detail = state
        .services
        .pos
        .create_transaction(request, &user.username)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(serde_json::json!({
        "success": true,
        "id": detail.sale.id,
        "invoice_number": detail.sale.invoice_number,
        "total": detail.sale.total
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/pos/transactions",
    responses((status = 200, description = "All POS transactions, newest first")),
    tag = "pos"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::POS_CREATE_SALE)?;
    let sales = state
        .services
        .pos
        .list_sales()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(sales))
}

#[utoipa::path(
    get,
    path = "/api/v1/pos/transactions/{id}",
    params(("id" = Uuid, Path, description = "Sale ID")),
    responses(
        (status = 200, description = "Transaction with lines", body = crate::services::pos::SaleDetail),
        (status = 404, description = "Sale not found", body = crate::errors::ErrorResponse)
    ),
    tag = "pos"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::POS_CREATE_SALE)?;
    let detail = state
        .services
        .pos
        .get_sale(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

pub fn pos_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route("/transactions/:id", get(get_transaction))
}
