//! OpenAPI document aggregation.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cellstock API",
        description = "Retail and mobile-shop management backend",
        license(name = "MIT")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::me,
        crate::handlers::catalog::list_categories,
        crate::handlers::catalog::create_category,
        crate::handlers::catalog::update_category,
        crate::handlers::catalog::delete_category,
        crate::handlers::catalog::list_brands,
        crate::handlers::catalog::create_brand,
        crate::handlers::catalog::update_brand,
        crate::handlers::catalog::delete_brand,
        crate::handlers::catalog::list_models,
        crate::handlers::catalog::create_model,
        crate::handlers::catalog::update_model,
        crate::handlers::catalog::delete_model,
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::bulk_delete,
        crate::handlers::products::bulk_update,
        crate::handlers::products::stock_history,
        crate::handlers::products::adjust_stock,
        crate::handlers::products::record_damage,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::receive_purchase_order,
        crate::handlers::grns::list_grns,
        crate::handlers::grns::get_grn,
        crate::handlers::imei::list_imeis,
        crate::handlers::imei::add_serials,
        crate::handlers::imei::verify_imei,
        crate::handlers::imei::mark_sold,
        crate::handlers::imei::mark_returned,
        crate::handlers::imei::delete_imei,
        crate::handlers::pos::create_transaction,
        crate::handlers::pos::list_transactions,
        crate::handlers::pos::get_transaction,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::create_customer,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::delete_customer,
        crate::handlers::customers::customer_history,
        crate::handlers::service_jobs::create_job,
        crate::handlers::service_jobs::list_jobs,
        crate::handlers::service_jobs::get_job,
        crate::handlers::service_jobs::transition_job,
        crate::handlers::service_jobs::add_part,
        crate::handlers::service_jobs::add_labor,
        crate::handlers::reports::dashboard_stats,
        crate::handlers::reports::sales_summary,
        crate::handlers::reports::export_products,
        crate::handlers::reports::export_grns,
        crate::handlers::reports::export_template,
        crate::handlers::reports::import_preview,
        crate::handlers::reports::import_products,
        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::update_user_status,
        crate::handlers::users::reset_password,
        crate::handlers::users::list_roles,
        crate::handlers::users::create_role,
        crate::handlers::users::update_role,
        crate::handlers::users::list_permissions,
        crate::handlers::users::get_role_permissions,
        crate::handlers::users::set_role_permissions,
        crate::handlers::users::list_audit_logs,
    ),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "catalog", description = "Categories, brands and device models"),
        (name = "products", description = "Products and the stock ledger"),
        (name = "purchase-orders", description = "Purchasing and receiving"),
        (name = "grns", description = "Goods received notes"),
        (name = "imei", description = "Serial tracking"),
        (name = "pos", description = "Point of sale"),
        (name = "customers", description = "Customers"),
        (name = "service-jobs", description = "Repair tickets"),
        (name = "reports", description = "Reports, exports and imports"),
        (name = "users", description = "User administration"),
        (name = "health", description = "Health checks")
    )
)]
pub struct ApiDoc;

pub fn api_doc() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
