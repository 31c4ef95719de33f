//! Cellstock API library.
//!
//! Retail and mobile-shop management backend: catalog, purchasing and goods
//! receipt, an append-only stock ledger with IMEI tracking, POS transactions,
//! service jobs and role-based user administration.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod openapi;
pub mod services;

use axum::{Extension, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{AuthRouterExt, AuthService};

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth_service: Arc<AuthService>,
    pub services: handlers::AppServices,
}

/// Assemble the full application router.
pub fn build_router(state: AppState) -> Router {
    let auth_service = state.auth_service.clone();

    let protected = Router::new()
        .nest("/auth", handlers::auth::auth_me_routes())
        .merge(handlers::catalog::catalog_routes())
        .nest(
            "/products",
            handlers::products::product_routes().merge(handlers::imei::product_imei_routes()),
        )
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
        .nest("/grns", handlers::grns::grn_routes())
        .nest("/imeis", handlers::imei::imei_routes())
        .nest("/pos", handlers::pos::pos_routes())
        .nest("/customers", handlers::customers::customer_routes())
        .nest("/service-jobs", handlers::service_jobs::service_job_routes())
        .nest("/dashboard", handlers::reports::dashboard_routes())
        .nest("/reports", handlers::reports::report_routes())
        .nest("/export", handlers::reports::export_routes())
        .nest("/import", handlers::reports::import_routes())
        .nest("/users", handlers::users::user_routes())
        .nest("/roles", handlers::users::role_routes())
        .nest("/permissions", handlers::users::permission_routes())
        .nest("/audit-logs", handlers::users::audit_log_routes())
        .with_auth();

    Router::new()
        .merge(handlers::health::health_routes())
        .merge(
            SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::api_doc()),
        )
        .nest("/api/v1/auth", handlers::auth::auth_routes())
        .nest("/api/v1", protected)
        .layer(Extension(auth_service))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
