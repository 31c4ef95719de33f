//! Reporting: dashboard statistics, sales summaries and CSV exports.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::pos_sale::TransactionType;
use crate::entities::{grn, grn_item, pos_sale, product, stock_movement};
use crate::errors::ServiceError;
use crate::services::catalog::{CatalogService, ProductFilter, ProductView};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_products: u64,
    pub low_stock: u64,
    pub out_of_stock: u64,
    pub stock_value: f64,
    pub low_stock_items: Vec<product::Model>,
    pub recent_movements: Vec<RecentMovement>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentMovement {
    #[serde(flatten)]
    pub movement: stock_movement::Model,
    pub product_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummaryBucket {
    pub transaction_type: String,
    pub count: u64,
    pub total_amount: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub buckets: Vec<SalesSummaryBucket>,
    pub net_total: f64,
}

/// A generated export: bytes plus the suggested download filename.
#[derive(Debug)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

const EXPORT_COLUMNS: &[&str] = &[
    "sku",
    "name",
    "category_name",
    "brand_name",
    "model_name",
    "description",
    "cost_price",
    "selling_price",
    "mrp",
    "current_stock",
    "min_stock_level",
    "storage_location",
    "color",
    "storage_capacity",
    "ram",
    "warranty_period",
    "supplier_name",
    "supplier_contact",
    "status",
];

#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
    catalog: CatalogService,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>, catalog: CatalogService) -> Self {
        Self { db, catalog }
    }

    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db;
        let active = product::Column::Status.eq("active");

        let total_products = product::Entity::find()
            .filter(active.clone())
            .count(db)
            .await?;

        let low_stock_condition = Expr::col(product::Column::CurrentStock)
            .lte(Expr::col(product::Column::MinStockLevel));
        let low_stock = product::Entity::find()
            .filter(active.clone())
            .filter(low_stock_condition.clone())
            .count(db)
            .await?;

        let out_of_stock = product::Entity::find()
            .filter(active.clone())
            .filter(product::Column::CurrentStock.eq(0))
            .count(db)
            .await?;

        let active_products = product::Entity::find()
            .filter(active.clone())
            .all(db)
            .await?;
        let stock_value: f64 = active_products
            .iter()
            .map(|p| p.current_stock as f64 * p.cost_price)
            .sum();

        let low_stock_items = product::Entity::find()
            .filter(active)
            .filter(low_stock_condition)
            .order_by_asc(product::Column::CurrentStock)
            .limit(10)
            .all(db)
            .await?;

        let movements = stock_movement::Entity::find()
            .order_by_desc(stock_movement::Column::CreatedAt)
            .limit(20)
            .all(db)
            .await?;
        let product_names: HashMap<Uuid, String> = active_products
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect();
        let recent_movements = movements
            .into_iter()
            .map(|m| RecentMovement {
                product_name: product_names.get(&m.product_id).cloned(),
                movement: m,
            })
            .collect();

        Ok(DashboardStats {
            total_products,
            low_stock,
            out_of_stock,
            stock_value: (stock_value * 100.0).round() / 100.0,
            low_stock_items,
            recent_movements,
        })
    }

    /// Counts and totals per transaction type over a date range.
    #[instrument(skip(self))]
    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<SalesSummary, ServiceError> {
        if from > to {
            return Err(ServiceError::ValidationError(
                "Start date must precede end date".to_string(),
            ));
        }

        let sales = pos_sale::Entity::find()
            .filter(pos_sale::Column::CreatedAt.gte(from))
            .filter(pos_sale::Column::CreatedAt.lte(to))
            .all(&*self.db)
            .await?;

        let mut buckets: HashMap<&'static str, (u64, f64)> = HashMap::new();
        let mut net_total = 0.0;
        for sale in &sales {
            let Some(kind) = TransactionType::parse(&sale.transaction_type) else {
                continue;
            };
            let entry = buckets.entry(kind.as_str()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += sale.total;
            net_total += sale.total;
        }

        let mut buckets: Vec<SalesSummaryBucket> = buckets
            .into_iter()
            .map(|(transaction_type, (count, total_amount))| SalesSummaryBucket {
                transaction_type: transaction_type.to_string(),
                count,
                total_amount: (total_amount * 100.0).round() / 100.0,
            })
            .collect();
        buckets.sort_by(|a, b| a.transaction_type.cmp(&b.transaction_type));

        Ok(SalesSummary {
            from,
            to,
            buckets,
            net_total: (net_total * 100.0).round() / 100.0,
        })
    }

    /// Export products as CSV, honoring the list filters and an optional
    /// column selection.
    #[instrument(skip(self))]
    pub async fn export_products(
        &self,
        filter: ProductFilter,
        columns: Option<Vec<String>>,
    ) -> Result<ExportFile, ServiceError> {
        let products = self.catalog.list_products(filter).await?;

        let selected: Vec<&str> = match &columns {
            Some(cols) if !cols.is_empty() => {
                let mut selected = Vec::new();
                for col in cols {
                    let known = EXPORT_COLUMNS
                        .iter()
                        .find(|c| **c == col.as_str())
                        .ok_or_else(|| {
                            ServiceError::ValidationError(format!("Unknown column: {}", col))
                        })?;
                    selected.push(*known);
                }
                selected
            }
            _ => EXPORT_COLUMNS.to_vec(),
        };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&selected)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        for view in &products {
            let record: Vec<String> = selected
                .iter()
                .map(|col| product_field(view, col))
                .collect();
            writer
                .write_record(&record)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        Ok(ExportFile {
            filename: format!(
                "products_export_{}.csv",
                Utc::now().format("%Y%m%d_%H%M%S")
            ),
            content_type: "text/csv",
            bytes,
        })
    }

    /// Export the GRN register: headers joined with their lines.
    #[instrument(skip(self))]
    pub async fn export_grns(&self) -> Result<ExportFile, ServiceError> {
        let headers = grn::Entity::find()
            .order_by_desc(grn::Column::ReceivedDate)
            .all(&*self.db)
            .await?;
        let lines = grn_item::Entity::find().all(&*self.db).await?;

        let mut lines_by_grn: HashMap<Uuid, Vec<&grn_item::Model>> = HashMap::new();
        for line in &lines {
            lines_by_grn.entry(line.grn_id).or_default().push(line);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "grn_number",
                "po_number",
                "supplier_name",
                "received_date",
                "total_items",
                "total_quantity",
                "payment_status",
                "storage_location",
                "created_by",
                "product_name",
                "quantity_received",
                "quantity_damaged",
                "damage_reason",
                "cost_price",
                "line_total",
            ])
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        for header in &headers {
            for line in lines_by_grn.get(&header.id).map(|v| v.as_slice()).unwrap_or(&[]) {
                let line_total = line.quantity_received as f64 * line.cost_price;
                writer
                    .write_record([
                        header.grn_number.clone(),
                        header.po_number.clone(),
                        header.supplier_name.clone(),
                        header.received_date.to_rfc3339(),
                        header.total_items.to_string(),
                        header.total_quantity.to_string(),
                        header.payment_status.clone(),
                        header.storage_location.clone().unwrap_or_default(),
                        header.created_by.clone(),
                        line.product_name.clone(),
                        line.quantity_received.to_string(),
                        line.quantity_damaged.to_string(),
                        line.damage_reason.clone().unwrap_or_default(),
                        format!("{:.2}", line.cost_price),
                        format!("{:.2}", line_total),
                    ])
                    .map_err(|e| ServiceError::InternalError(e.to_string()))?;
            }
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        Ok(ExportFile {
            filename: format!("grn_report_{}.csv", Utc::now().format("%Y%m%d_%H%M%S")),
            content_type: "text/csv",
            bytes,
        })
    }

    /// The import template with headers and two sample rows.
    pub fn export_template(&self) -> Result<ExportFile, ServiceError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(EXPORT_COLUMNS)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        writer
            .write_record([
                "SKU001",
                "Sample Product 1",
                "Smartphones",
                "Apple",
                "iPhone 14",
                "Sample description",
                "500.00",
                "650.00",
                "699.00",
                "10",
                "5",
                "A1",
                "Black",
                "128GB",
                "6GB",
                "12 months",
                "Supplier A",
                "+1234567890",
                "active",
            ])
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        writer
            .write_record([
                "SKU002",
                "Sample Product 2",
                "Accessories",
                "Samsung",
                "Galaxy S23",
                "Another description",
                "300.00",
                "400.00",
                "449.00",
                "25",
                "10",
                "B2",
                "White",
                "64GB",
                "8GB",
                "24 months",
                "Supplier B",
                "+0987654321",
                "active",
            ])
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        Ok(ExportFile {
            filename: "product_import_template.csv".to_string(),
            content_type: "text/csv",
            bytes,
        })
    }
}

fn product_field(view: &ProductView, column: &str) -> String {
    let p = &view.product;
    match column {
        "sku" => p.sku.clone().unwrap_or_default(),
        "name" => p.name.clone(),
        "category_name" => view.category_name.clone().unwrap_or_default(),
        "brand_name" => view.brand_name.clone().unwrap_or_default(),
        "model_name" => view.model_name.clone().unwrap_or_default(),
        "description" => p.description.clone().unwrap_or_default(),
        "cost_price" => format!("{:.2}", p.cost_price),
        "selling_price" => format!("{:.2}", p.selling_price),
        "mrp" => format!("{:.2}", p.mrp),
        "current_stock" => p.current_stock.to_string(),
        "min_stock_level" => p.min_stock_level.to_string(),
        "storage_location" => p.storage_location.clone().unwrap_or_default(),
        "color" => p.color.clone().unwrap_or_default(),
        "storage_capacity" => p.storage_capacity.clone().unwrap_or_default(),
        "ram" => p.ram.clone().unwrap_or_default(),
        "warranty_period" => p.warranty_period.clone().unwrap_or_default(),
        "supplier_name" => p.supplier_name.clone().unwrap_or_default(),
        "supplier_contact" => p.supplier_contact.clone().unwrap_or_default(),
        "status" => p.status.clone(),
        _ => String::new(),
    }
}
