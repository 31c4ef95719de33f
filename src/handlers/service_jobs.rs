//! Repair-ticket endpoints.

use super::common::{
    created_response, map_service_error, require_permission, success_response, validate_input,
};
use crate::auth::permissions as perm;
use crate::entities::service_job::ServiceJobStatus;
use crate::services::service_jobs::NewServiceJob;
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
pub struct CreateServiceJobRequest {
    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Device name is required"))]
    pub device_name: String,
    pub imei: Option<String>,
    #[validate(length(min = 1, message = "Problem description is required"))]
    pub problem_description: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub estimated_cost: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub advance_paid: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ServiceJobListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TransitionRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddPartRequest {
    #[validate(length(min = 1, message = "Part name is required"))]
    pub part_name: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    #[validate(range(min = 0.0))]
    pub unit_cost: f64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddLaborRequest {
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub amount: f64,
}

#[utoipa::path(
    post,
    path = "/api/v1/service-jobs",
    request_body = CreateServiceJobRequest,
    responses((status = 201, description = "Service job created")),
    tag = "service-jobs"
)]
pub async fn create_job(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateServiceJobRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SERVICE_CREATE_JOB)?;
    validate_input(&payload)?;
    let job = state
        .services
        .service_jobs
        .create(
            NewServiceJob {
                customer_name: payload.customer_name,
                customer_phone: payload.customer_phone,
                customer_id: payload.customer_id,
                device_name: payload.device_name,
                imei: payload.imei,
                problem_description: payload.problem_description,
                estimated_cost: payload.estimated_cost,
                advance_paid: payload.advance_paid,
                notes: payload.notes,
            },
            &user.username,
        )
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": job.id,
        "job_number": job.job_number
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/service-jobs",
    params(("status" = Option<String>, Query, description = "Filter by workflow status")),
    responses((status = 200, description = "Service jobs, newest first")),
    tag = "service-jobs"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ServiceJobListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SERVICE_VIEW_JOBS)?;
    let jobs = state
        .services
        .service_jobs
        .list(query.status.as_deref())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(jobs))
}

#[utoipa::path(
    get,
    path = "/api/v1/service-jobs/{id}",
    params(("id" = Uuid, Path, description = "Service job ID")),
    responses(
        (status = 200, description = "Job with history, parts and labor", body = crate::services::service_jobs::ServiceJobDetail),
        (status = 404, description = "Job not found", body = crate::errors::ErrorResponse)
    ),
    tag = "service-jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SERVICE_VIEW_JOBS)?;
    let detail = state
        .services
        .service_jobs
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

/// Move a job to a new workflow status.
#[utoipa::path(
    post,
    path = "/api/v1/service-jobs/{id}/status",
    request_body = TransitionRequest,
    params(("id" = Uuid, Path, description = "Service job ID")),
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Job is closed or status invalid", body = crate::errors::ErrorResponse)
    ),
    tag = "service-jobs"
)]
pub async fn transition_job(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;
    let to_status = ServiceJobStatus::parse(&payload.status).ok_or_else(|| {
        ApiError::ValidationError(format!("Invalid service job status: {}", payload.status))
    })?;

    let required = if to_status.is_terminal() {
        perm::SERVICE_CLOSE_JOB
    } else {
        perm::SERVICE_EDIT_JOB
    };
    require_permission(&user, required)?;

    state
        .services
        .service_jobs
        .transition(id, to_status, payload.notes, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({ "success": true })))
}

#[utoipa::path(
    post,
    path = "/api/v1/service-jobs/{id}/parts",
    request_body = AddPartRequest,
    params(("id" = Uuid, Path, description = "Service job ID")),
    responses((status = 201, description = "Part added, cost re-rolled")),
    tag = "service-jobs"
)]
pub async fn add_part(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddPartRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SERVICE_EDIT_JOB)?;
    validate_input(&payload)?;
    let part = state
        .services
        .service_jobs
        .add_part(id, payload.part_name, payload.quantity, payload.unit_cost)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": part.id
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/service-jobs/{id}/labor",
    request_body = AddLaborRequest,
    params(("id" = Uuid, Path, description = "Service job ID")),
    responses((status = 201, description = "Labor charge added, cost re-rolled")),
    tag = "service-jobs"
)]
pub async fn add_labor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddLaborRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::SERVICE_EDIT_JOB)?;
    validate_input(&payload)?;
    let charge = state
        .services
        .service_jobs
        .add_labor_charge(id, payload.description, payload.amount)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(serde_json::json!({
        "success": true,
        "id": charge.id
    })))
}

pub fn service_job_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs).post(create_job))
        .route("/:id", get(get_job))
        .route("/:id/status", post(transition_job))
        .route("/:id/parts", post(add_part))
        .route("/:id/labor", post(add_labor))
}
