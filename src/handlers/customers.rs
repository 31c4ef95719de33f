use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::services::customers::CustomerInput;
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CustomerRequest {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub name: String,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub gstin: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerListQuery {
    pub search: Option<String>,
}

impl CustomerRequest {
    fn into_input(self) -> CustomerInput {
        CustomerInput {
            name: self.name,
            phone: self.phone,
            email: self.email,
            address: self.address,
            city: self.city,
            gstin: self.gstin,
            notes: self.notes,
            status: self.status,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/customers",
    params(("search" = Option<String>, Query, description = "Match name or phone")),
    responses((status = 200, description = "Customers")),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<CustomerListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::CUSTOMERS_VIEW)?;
    let customers = state
        .services
        .customers
        .list(query.search)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(customers))
}

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CustomerRequest,
    responses(
        (status = 201, description = "Customer created"),
        (status = 409, description = "Phone already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CustomerRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::CUSTOMERS_ADD)?;
    validate_input(&payload)?;
    let created = state
        .services
        .customers
        .create(payload.into_input(), &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": created.id
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer detail"),
        (status = 404, description = "Customer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::CUSTOMERS_VIEW)?;
    let found = state
        .services
        .customers
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(found))
}

#[utoipa::path(
    put,
    path = "/api/v1/customers/{id}",
    request_body = CustomerRequest,
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses((status = 200, description = "Customer updated")),
    tag = "customers"
)]
pub async fn update_customer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::CUSTOMERS_EDIT)?;
    validate_input(&payload)?;
    state
        .services
        .customers
        .update(id, payload.into_input())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/customers/{id}",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer deleted"),
        (status = 400, description = "Customer has sales", body = crate::errors::ErrorResponse)
    ),
    tag = "customers"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::CUSTOMERS_DELETE)?;
    state
        .services
        .customers
        .delete(id, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}/history",
    params(("id" = Uuid, Path, description = "Customer ID")),
    responses((status = 200, description = "Customer with their transactions", body = crate::services::customers::CustomerHistory)),
    tag = "customers"
)]
pub async fn customer_history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::CUSTOMERS_VIEW_HISTORY)?;
    let history = state
        .services
        .customers
        .purchase_history(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(history))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer)
                .put(update_customer)
                .delete(delete_customer),
        )
        .route("/:id/history", get(customer_history))
}
