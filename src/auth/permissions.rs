//! Permission keys and the wildcard matcher.
//!
//! Keys follow the `module.action` convention. The superuser grant is the
//! first-class `*` permission row assigned to the Admin role — permission
//! checks never compare role names.

/// Wildcard granted to Admin.
pub const WILDCARD: &str = "*";

// POS
pub const POS_CREATE_SALE: &str = "pos.create_sale";
pub const POS_EDIT_SALE: &str = "pos.edit_sale";
pub const POS_CANCEL_SALE: &str = "pos.cancel_sale";
pub const POS_PROCESS_RETURNS: &str = "pos.process_returns";
pub const POS_APPLY_DISCOUNTS: &str = "pos.apply_discounts";
pub const POS_VIEW_CUSTOMER_INFO: &str = "pos.view_customer_info";
pub const POS_PRINT_INVOICE: &str = "pos.print_invoice";

// Inventory
pub const INVENTORY_VIEW: &str = "inventory.view";
pub const INVENTORY_ADD_PRODUCT: &str = "inventory.add_product";
pub const INVENTORY_EDIT_PRODUCT: &str = "inventory.edit_product";
pub const INVENTORY_DELETE_PRODUCT: &str = "inventory.delete_product";
pub const INVENTORY_VIEW_COST_PRICE: &str = "inventory.view_cost_price";
pub const INVENTORY_STOCK_ADJUSTMENT: &str = "inventory.stock_adjustment";
pub const INVENTORY_VIEW_IMEI: &str = "inventory.view_imei";

// Purchase orders
pub const PURCHASE_VIEW: &str = "purchase.view";
pub const PURCHASE_CREATE: &str = "purchase.create";
pub const PURCHASE_EDIT: &str = "purchase.edit";
pub const PURCHASE_DELETE: &str = "purchase.delete";
pub const PURCHASE_RECEIVE: &str = "purchase.receive";

// Reports
pub const REPORTS_VIEW_SALES: &str = "reports.view_sales";
pub const REPORTS_VIEW_PROFIT: &str = "reports.view_profit";
pub const REPORTS_VIEW_INVENTORY: &str = "reports.view_inventory";
pub const REPORTS_EXPORT: &str = "reports.export";
pub const REPORTS_VIEW_DASHBOARD: &str = "reports.view_dashboard";

// Customers
pub const CUSTOMERS_VIEW: &str = "customers.view";
pub const CUSTOMERS_ADD: &str = "customers.add";
pub const CUSTOMERS_EDIT: &str = "customers.edit";
pub const CUSTOMERS_DELETE: &str = "customers.delete";
pub const CUSTOMERS_VIEW_HISTORY: &str = "customers.view_history";

// Service
pub const SERVICE_VIEW_JOBS: &str = "service.view_jobs";
pub const SERVICE_CREATE_JOB: &str = "service.create_job";
pub const SERVICE_EDIT_JOB: &str = "service.edit_job";
pub const SERVICE_CLOSE_JOB: &str = "service.close_job";

// Settings
pub const SETTINGS_VIEW: &str = "settings.view";
pub const SETTINGS_MANAGE_USERS: &str = "settings.manage_users";
pub const SETTINGS_MANAGE_ROLES: &str = "settings.manage_roles";
pub const SETTINGS_VIEW_AUDIT_LOGS: &str = "settings.view_audit_logs";

/// The full permission catalog: (key, display name, module).
pub fn permission_catalog() -> Vec<(&'static str, &'static str, &'static str)> {
    vec![
        (WILDCARD, "All Permissions", "System"),
        (POS_CREATE_SALE, "Create Sale", "POS"),
        (POS_EDIT_SALE, "Edit Sale", "POS"),
        (POS_CANCEL_SALE, "Cancel Sale", "POS"),
        (POS_PROCESS_RETURNS, "Process Returns", "POS"),
        (POS_APPLY_DISCOUNTS, "Apply Discounts", "POS"),
        (POS_VIEW_CUSTOMER_INFO, "View Customer Info in POS", "POS"),
        (POS_PRINT_INVOICE, "Print Invoice", "POS"),
        (INVENTORY_VIEW, "View Inventory", "Inventory"),
        (INVENTORY_ADD_PRODUCT, "Add Product", "Inventory"),
        (INVENTORY_EDIT_PRODUCT, "Edit Product", "Inventory"),
        (INVENTORY_DELETE_PRODUCT, "Delete Product", "Inventory"),
        (INVENTORY_VIEW_COST_PRICE, "View Cost Price", "Inventory"),
        (
            INVENTORY_STOCK_ADJUSTMENT,
            "Manage Stock Adjustments",
            "Inventory",
        ),
        (INVENTORY_VIEW_IMEI, "View IMEI Tracking", "Inventory"),
        (PURCHASE_VIEW, "View Purchase Orders", "Purchase Orders"),
        (PURCHASE_CREATE, "Create Purchase Order", "Purchase Orders"),
        (PURCHASE_EDIT, "Edit Purchase Order", "Purchase Orders"),
        (PURCHASE_DELETE, "Delete Purchase Order", "Purchase Orders"),
        (PURCHASE_RECEIVE, "Receive Purchase Order", "Purchase Orders"),
        (REPORTS_VIEW_SALES, "View Sales Reports", "Reports"),
        (REPORTS_VIEW_PROFIT, "View Profit & Margin Reports", "Reports"),
        (REPORTS_VIEW_INVENTORY, "View Inventory Reports", "Reports"),
        (REPORTS_EXPORT, "Export Reports", "Reports"),
        (REPORTS_VIEW_DASHBOARD, "View Dashboard", "Reports"),
        (CUSTOMERS_VIEW, "View Customers", "Customers"),
        (CUSTOMERS_ADD, "Add Customer", "Customers"),
        (CUSTOMERS_EDIT, "Edit Customer", "Customers"),
        (CUSTOMERS_DELETE, "Delete Customer", "Customers"),
        (CUSTOMERS_VIEW_HISTORY, "View Customer History", "Customers"),
        (SERVICE_VIEW_JOBS, "View Service Jobs", "Service"),
        (SERVICE_CREATE_JOB, "Create Service Job", "Service"),
        (SERVICE_EDIT_JOB, "Edit Service Job", "Service"),
        (SERVICE_CLOSE_JOB, "Close Service Job", "Service"),
        (SETTINGS_VIEW, "View Settings", "Settings"),
        (SETTINGS_MANAGE_USERS, "Manage Users", "Settings"),
        (SETTINGS_MANAGE_ROLES, "Manage Roles & Permissions", "Settings"),
        (SETTINGS_VIEW_AUDIT_LOGS, "View Audit Logs", "Settings"),
    ]
}

/// Default role → permission assignments, seeded at bootstrap.
pub fn default_role_grants() -> Vec<(&'static str, &'static str, Vec<&'static str>)> {
    vec![
        (
            "Admin",
            "Administrator with full access",
            vec![WILDCARD],
        ),
        (
            "Manager",
            "Manager with operational control",
            vec![
                POS_CREATE_SALE,
                POS_EDIT_SALE,
                POS_PROCESS_RETURNS,
                POS_APPLY_DISCOUNTS,
                INVENTORY_VIEW,
                INVENTORY_ADD_PRODUCT,
                INVENTORY_EDIT_PRODUCT,
                INVENTORY_VIEW_COST_PRICE,
                INVENTORY_STOCK_ADJUSTMENT,
                INVENTORY_VIEW_IMEI,
                PURCHASE_VIEW,
                PURCHASE_CREATE,
                PURCHASE_EDIT,
                PURCHASE_RECEIVE,
                REPORTS_VIEW_SALES,
                REPORTS_VIEW_PROFIT,
                REPORTS_VIEW_INVENTORY,
                REPORTS_EXPORT,
                REPORTS_VIEW_DASHBOARD,
                CUSTOMERS_VIEW,
                CUSTOMERS_ADD,
                CUSTOMERS_EDIT,
                CUSTOMERS_VIEW_HISTORY,
                SERVICE_VIEW_JOBS,
                SERVICE_CREATE_JOB,
                SERVICE_EDIT_JOB,
                SERVICE_CLOSE_JOB,
                SETTINGS_VIEW,
            ],
        ),
        (
            "Cashier",
            "POS-only user for sales operations",
            vec![
                POS_CREATE_SALE,
                POS_PROCESS_RETURNS,
                POS_VIEW_CUSTOMER_INFO,
                POS_PRINT_INVOICE,
                INVENTORY_VIEW,
                CUSTOMERS_VIEW,
                CUSTOMERS_ADD,
                REPORTS_VIEW_DASHBOARD,
            ],
        ),
        (
            "Sales Staff",
            "Limited product access for sales operations",
            vec![
                POS_CREATE_SALE,
                POS_VIEW_CUSTOMER_INFO,
                POS_PRINT_INVOICE,
                INVENTORY_VIEW,
                CUSTOMERS_VIEW,
                CUSTOMERS_ADD,
                CUSTOMERS_VIEW_HISTORY,
            ],
        ),
        (
            "Staff",
            "Staff with basic POS operations",
            vec![
                POS_CREATE_SALE,
                POS_VIEW_CUSTOMER_INFO,
                INVENTORY_VIEW,
                CUSTOMERS_VIEW,
            ],
        ),
    ]
}

/// Check whether a held permission satisfies a required one.
///
/// Supports exact matches, module wildcards (`pos.*`) and the superuser `*`.
pub fn permission_matches(held: &str, required: &str) -> bool {
    if held == required || held == WILDCARD {
        return true;
    }
    if let Some(prefix) = held.strip_suffix(".*") {
        if let Some(required_module) = required.split('.').next() {
            return required_module == prefix;
        }
    }
    false
}

/// Check a permission set against a required key.
pub fn has_permission(held: &[String], required: &str) -> bool {
    held.iter().any(|p| permission_matches(p, required))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(permission_matches(POS_CREATE_SALE, POS_CREATE_SALE));
        assert!(!permission_matches(POS_CREATE_SALE, POS_EDIT_SALE));
    }

    #[test]
    fn module_wildcard() {
        assert!(permission_matches("pos.*", POS_CREATE_SALE));
        assert!(!permission_matches("pos.*", INVENTORY_VIEW));
    }

    #[test]
    fn superuser_wildcard_matches_everything() {
        for (key, _, _) in permission_catalog() {
            assert!(permission_matches(WILDCARD, key));
        }
    }

    #[test]
    fn permission_set_check() {
        let held = vec!["inventory.view".to_string(), "pos.*".to_string()];
        assert!(has_permission(&held, POS_PROCESS_RETURNS));
        assert!(has_permission(&held, INVENTORY_VIEW));
        assert!(!has_permission(&held, SETTINGS_MANAGE_USERS));
    }
}
