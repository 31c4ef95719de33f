//! Reporting, export and import endpoints.

use super::common::{
    file_response, map_service_error, require_permission, success_response,
};
use crate::auth::permissions as perm;
use crate::services::catalog::ProductFilter;
use crate::services::imports::ImportOptions;
use crate::{auth::AuthenticatedUser, errors::ApiError, handlers::AppState};
use axum::{
    extract::{Multipart, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateRangeQuery {
    /// YYYY-MM-DD
    pub start_date: String,
    /// YYYY-MM-DD
    pub end_date: String,
}

impl DateRangeQuery {
    fn to_datetime_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
        let parse = |raw: &str| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| ApiError::ValidationError(format!("Invalid date format: {}", e)))
        };
        let start = parse(&self.start_date)?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ApiError::ValidationError("Invalid start date".to_string()))?
            .and_utc();
        let end = parse(&self.end_date)?
            .and_hms_opt(23, 59, 59)
            .ok_or_else(|| ApiError::ValidationError("Invalid end date".to_string()))?
            .and_utc();
        Ok((start, end))
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductExportQuery {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub status: Option<String>,
    pub stock_status: Option<String>,
    /// Comma-separated column selection
    pub columns: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses((status = 200, description = "Dashboard statistics", body = crate::services::reports::DashboardStats)),
    tag = "reports"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::REPORTS_VIEW_DASHBOARD)?;
    let stats = state
        .services
        .reports
        .dashboard_stats()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/sales-summary",
    params(
        ("start_date" = String, Query, description = "YYYY-MM-DD"),
        ("end_date" = String, Query, description = "YYYY-MM-DD")
    ),
    responses((status = 200, description = "Totals per transaction type", body = crate::services::reports::SalesSummary)),
    tag = "reports"
)]
pub async fn sales_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(range): Query<DateRangeQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::REPORTS_VIEW_SALES)?;
    let (start, end) = range.to_datetime_range()?;
    let summary = state
        .services
        .reports
        .sales_summary(start, end)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(summary))
}

/// Export products as a delimited file honoring the list filters.
#[utoipa::path(
    get,
    path = "/api/v1/export/products",
    params(("columns" = Option<String>, Query, description = "Comma-separated column selection")),
    responses((status = 200, description = "CSV download")),
    tag = "reports"
)]
pub async fn export_products(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ProductExportQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::REPORTS_EXPORT)?;

    let columns = query.columns.as_deref().map(|raw| {
        raw.split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
    });
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category_id,
        brand_id: query.brand_id,
        model_id: query.model_id,
        status: query.status,
        stock_status: query.stock_status,
    };

    let file = state
        .services
        .reports
        .export_products(filter, columns)
        .await
        .map_err(map_service_error)?;
    Ok(file_response(file))
}

/// Export the GRN register.
#[utoipa::path(
    get,
    path = "/api/v1/export/grns",
    responses((status = 200, description = "CSV download")),
    tag = "reports"
)]
pub async fn export_grns(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::REPORTS_EXPORT)?;
    let file = state
        .services
        .reports
        .export_grns()
        .await
        .map_err(map_service_error)?;
    Ok(file_response(file))
}

/// Download the import template.
#[utoipa::path(
    get,
    path = "/api/v1/export/template",
    responses((status = 200, description = "CSV template download")),
    tag = "reports"
)]
pub async fn export_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::REPORTS_EXPORT)?;
    let file = state
        .services
        .reports
        .export_template()
        .map_err(map_service_error)?;
    Ok(file_response(file))
}

/// Pull the uploaded file and form flags out of a multipart body.
async fn read_import_upload(
    mut multipart: Multipart,
) -> Result<(Vec<u8>, ImportOptions), ApiError> {
    let mut data: Option<Vec<u8>> = None;
    let mut options = ImportOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let value = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?;
        match name.as_str() {
            "file" => data = Some(value.to_vec()),
            "update_existing" => {
                options.update_existing = String::from_utf8_lossy(&value) == "true"
            }
            "skip_errors" => options.skip_errors = String::from_utf8_lossy(&value) != "false",
            "auto_create" => options.auto_create = String::from_utf8_lossy(&value) != "false",
            _ => {}
        }
    }

    let data = data.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    Ok((data, options))
}

/// Validate an import file without writing anything.
#[utoipa::path(
    post,
    path = "/api/v1/import/products/preview",
    responses((status = 200, description = "Preview and validation", body = crate::services::imports::ImportPreview)),
    tag = "reports"
)]
pub async fn import_preview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_ADD_PRODUCT)?;
    let (data, _) = read_import_upload(multipart).await?;
    let preview = state
        .services
        .imports
        .preview(&data)
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "success": true,
        "total_rows": preview.total_rows,
        "preview_rows": preview.preview_rows,
        "columns": preview.columns,
        "validation": {
            "valid_count": preview.valid_count,
            "error_count": preview.error_count,
            "errors": preview.errors
        }
    })))
}

/// Import products from an uploaded delimited file.
#[utoipa::path(
    post,
    path = "/api/v1/import/products",
    responses(
        (status = 200, description = "Import report", body = crate::services::imports::ImportReport),
        (status = 400, description = "Import aborted", body = crate::errors::ErrorResponse)
    ),
    tag = "reports"
)]
pub async fn import_products(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    require_permission(&user, perm::INVENTORY_ADD_PRODUCT)?;
    let (data, options) = read_import_upload(multipart).await?;
    let report = state
        .services
        .imports
        .import_products(&data, options, &user.username)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(serde_json::json!({
        "success": true,
        "imported": report.imported,
        "updated": report.updated,
        "created_categories": report.created_categories,
        "created_brands": report.created_brands,
        "created_models": report.created_models,
        "errors": report.errors
    })))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/stats", get(dashboard_stats))
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/sales-summary", get(sales_summary))
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(export_products))
        .route("/grns", get(export_grns))
        .route("/template", get(export_template))
}

pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(import_products))
        .route("/products/preview", post(import_preview))
}
