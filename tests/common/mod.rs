//! Shared test harness: in-memory SQLite with the real migration chain and
//! RBAC seed applied.
#![allow(dead_code)]

use cellstock_api::audit::AuditRecorder;
use cellstock_api::handlers::AppServices;
use cellstock_api::services::catalog::NewProduct;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;

pub async fn setup() -> (Arc<DatabaseConnection>, AppServices) {
    // A single pooled connection keeps every statement on the same
    // in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("connect in-memory sqlite");
    cellstock_api::db::run_migrations(&db)
        .await
        .expect("run migrations");
    cellstock_api::db::seed_rbac(&db).await.expect("seed rbac");

    let db = Arc::new(db);
    let services = AppServices::new(db.clone(), AuditRecorder::null());
    (db, services)
}

pub fn sample_product(name: &str, opening_stock: i32) -> NewProduct {
    NewProduct {
        sku: Some(format!("SKU-{}", name.replace(' ', "-").to_uppercase())),
        name: name.to_string(),
        category_id: None,
        brand_id: None,
        model_id: None,
        description: None,
        cost_price: 100.0,
        selling_price: 150.0,
        mrp: 180.0,
        opening_stock,
        min_stock_level: 5,
        storage_location: None,
        color: None,
        storage_capacity: None,
        ram: None,
        warranty_period: None,
        supplier_name: None,
        supplier_contact: None,
        status: cellstock_api::entities::product::ProductStatus::Active,
    }
}
