pub mod auth;
pub mod catalog;
pub mod common;
pub mod customers;
pub mod grns;
pub mod health;
pub mod imei;
pub mod pos;
pub mod products;
pub mod purchase_orders;
pub mod reports;
pub mod service_jobs;
pub mod users;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::audit::AuditRecorder;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services container used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: crate::services::catalog::CatalogService,
    pub stock: crate::services::stock::StockService,
    pub imei: crate::services::imei::ImeiService,
    pub procurement: crate::services::procurement::ProcurementService,
    pub pos: crate::services::pos::PosService,
    pub customers: crate::services::customers::CustomerService,
    pub service_jobs: crate::services::service_jobs::ServiceJobService,
    pub reports: crate::services::reports::ReportService,
    pub imports: crate::services::imports::ImportService,
    pub user_admin: crate::services::users::UserAdminService,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        let catalog = crate::services::catalog::CatalogService::new(db.clone(), audit.clone());
        Self {
            stock: crate::services::stock::StockService::new(db.clone(), audit.clone()),
            imei: crate::services::imei::ImeiService::new(db.clone(), audit.clone()),
            procurement: crate::services::procurement::ProcurementService::new(
                db.clone(),
                audit.clone(),
            ),
            pos: crate::services::pos::PosService::new(db.clone(), audit.clone()),
            customers: crate::services::customers::CustomerService::new(db.clone(), audit.clone()),
            service_jobs: crate::services::service_jobs::ServiceJobService::new(
                db.clone(),
                audit.clone(),
            ),
            reports: crate::services::reports::ReportService::new(db.clone(), catalog.clone()),
            imports: crate::services::imports::ImportService::new(db.clone(), audit.clone()),
            user_admin: crate::services::users::UserAdminService::new(db, audit),
            catalog,
        }
    }
}
