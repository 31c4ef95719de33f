//! Bulk product import from delimited files.
//!
//! Each import runs in one transaction. Row problems are detected by
//! validation before any SQL runs for the row, so `skip_errors` can collect
//! them and continue; with `skip_errors` off the first problem rolls the
//! whole batch back.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::stock_movement::{MovementType, ReferenceType};
use crate::entities::{brand, category, device_model, product};
use crate::errors::ServiceError;
use crate::services::stock::record_movement;

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub update_existing: bool,
    pub skip_errors: bool,
    pub auto_create: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            update_existing: false,
            skip_errors: true,
            auto_create: true,
        }
    }
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ImportReport {
    pub imported: u64,
    pub updated: u64,
    pub created_categories: u64,
    pub created_brands: u64,
    pub created_models: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportPreview {
    pub total_rows: usize,
    pub preview_rows: Vec<HashMap<String, String>>,
    pub columns: Vec<String>,
    pub valid_count: usize,
    pub error_count: usize,
    pub errors: Vec<String>,
}

/// Per-import-run caches so reference rows are created at most once.
#[derive(Default)]
struct ReferenceCaches {
    categories: HashMap<String, Uuid>,
    brands: HashMap<String, Uuid>,
    models: HashMap<(Uuid, String), Uuid>,
}

#[derive(Clone)]
pub struct ImportService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl ImportService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Validate a delimited file without writing anything.
    pub fn preview(&self, data: &[u8]) -> Result<ImportPreview, ServiceError> {
        let rows = parse_rows(data)?;
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        let mut errors = Vec::new();
        let mut valid_count = 0;
        for (index, row) in rows.iter().enumerate() {
            if field(row, "name").is_none() {
                errors.push(format!("Row {}: Product name is required", index + 2));
            } else {
                valid_count += 1;
            }
        }

        Ok(ImportPreview {
            total_rows: rows.len(),
            preview_rows: rows.into_iter().take(3).collect(),
            columns,
            valid_count,
            error_count: errors.len(),
            errors: errors.into_iter().take(50).collect(),
        })
    }

    /// Import products from a delimited file.
    #[instrument(skip(self, data))]
    pub async fn import_products(
        &self,
        data: &[u8],
        options: ImportOptions,
        actor: &str,
    ) -> Result<ImportReport, ServiceError> {
        let rows = parse_rows(data)?;

        let txn = self.db.begin().await?;
        let mut report = ImportReport::default();
        let mut caches = ReferenceCaches::default();

        for (index, row) in rows.iter().enumerate() {
            let row_number = index + 2; // header occupies row 1
            match self
                .import_row(&txn, row, &options, &mut caches, &mut report, actor)
                .await
            {
                Ok(()) => {}
                Err(RowError::Skippable(message)) => {
                    let message = format!("Row {}: {}", row_number, message);
                    if options.skip_errors {
                        report.errors.push(message);
                    } else {
                        txn.rollback().await?;
                        return Err(ServiceError::ValidationError(message));
                    }
                }
                Err(RowError::Fatal(e)) => {
                    txn.rollback().await?;
                    return Err(e);
                }
            }
        }

        txn.commit().await?;

        self.audit.record(AuditEntry::new(
            None,
            "products_imported",
            format!(
                "Imported {} and updated {} products by {}",
                report.imported, report.updated, actor
            ),
        ));
        Ok(report)
    }

    async fn import_row(
        &self,
        txn: &DatabaseTransaction,
        row: &HashMap<String, String>,
        options: &ImportOptions,
        caches: &mut ReferenceCaches,
        report: &mut ImportReport,
        actor: &str,
    ) -> Result<(), RowError> {
        let name = field(row, "name").ok_or_else(|| {
            RowError::Skippable("Missing product name - skipped".to_string())
        })?;

        let cost_price = parse_price(row, "cost_price")?;
        let selling_price = parse_price(row, "selling_price")?;
        let mrp = parse_price(row, "mrp")?;
        let current_stock = parse_int(row, "current_stock")?.unwrap_or(0);
        let min_stock_level = parse_int(row, "min_stock_level")?.unwrap_or(10);
        let status = field(row, "status").unwrap_or_else(|| "active".to_string());
        if product::ProductStatus::parse(&status).is_none() {
            return Err(RowError::Skippable(format!("Invalid status: {}", status)));
        }

        let category_id = if options.auto_create {
            self.resolve_category(txn, row, caches, report).await?
        } else {
            None
        };
        let brand_id = if options.auto_create {
            self.resolve_brand(txn, row, caches, report).await?
        } else {
            None
        };
        let model_id = if options.auto_create {
            self.resolve_model(txn, row, brand_id, caches, report).await?
        } else {
            None
        };

        let sku = field(row, "sku");
        let existing = match &sku {
            Some(sku) => product::Entity::find()
                .filter(product::Column::Sku.eq(sku.clone()))
                .one(txn)
                .await
                .map_err(|e| RowError::Fatal(e.into()))?,
            None => None,
        };

        match existing {
            Some(existing) if options.update_existing => {
                let stock_diff = current_stock - existing.current_stock;
                product::Entity::update(product::ActiveModel {
                    id: Set(existing.id),
                    name: Set(name),
                    category_id: Set(category_id.or(existing.category_id)),
                    brand_id: Set(brand_id.or(existing.brand_id)),
                    model_id: Set(model_id.or(existing.model_id)),
                    description: Set(field(row, "description").or(existing.description)),
                    cost_price: Set(cost_price.unwrap_or(existing.cost_price)),
                    selling_price: Set(selling_price.unwrap_or(existing.selling_price)),
                    mrp: Set(mrp.unwrap_or(existing.mrp)),
                    current_stock: Set(current_stock),
                    min_stock_level: Set(min_stock_level),
                    status: Set(status),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                })
                .exec(txn)
                .await
                .map_err(|e| RowError::Fatal(e.into()))?;

                if stock_diff != 0 {
                    record_movement(
                        txn,
                        existing.id,
                        MovementType::Adjustment,
                        stock_diff,
                        Some((ReferenceType::Manual, existing.id)),
                        Some("Stock adjustment via import".to_string()),
                        Some(actor.to_string()),
                    )
                    .await
                    .map_err(RowError::Fatal)?;
                }
                report.updated += 1;
            }
            Some(_) => {
                return Err(RowError::Skippable(format!(
                    "SKU already exists: {}",
                    sku.unwrap_or_default()
                )));
            }
            None => {
                let now = Utc::now();
                let created = product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    sku: Set(sku),
                    name: Set(name),
                    category_id: Set(category_id),
                    brand_id: Set(brand_id),
                    model_id: Set(model_id),
                    description: Set(field(row, "description")),
                    cost_price: Set(cost_price.unwrap_or(0.0)),
                    selling_price: Set(selling_price.unwrap_or(0.0)),
                    mrp: Set(mrp.unwrap_or(0.0)),
                    opening_stock: Set(current_stock),
                    current_stock: Set(current_stock),
                    min_stock_level: Set(min_stock_level),
                    storage_location: Set(field(row, "storage_location")),
                    color: Set(field(row, "color")),
                    storage_capacity: Set(field(row, "storage_capacity")),
                    ram: Set(field(row, "ram")),
                    warranty_period: Set(field(row, "warranty_period")),
                    supplier_name: Set(field(row, "supplier_name")),
                    supplier_contact: Set(field(row, "supplier_contact")),
                    status: Set(status),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(txn)
                .await
                .map_err(|e| RowError::Fatal(e.into()))?;

                // Imported stock seeds the ledger like any other opening
                // stock, so the conservation invariant holds for imports too.
                if current_stock > 0 {
                    record_movement(
                        txn,
                        created.id,
                        MovementType::OpeningStock,
                        current_stock,
                        Some((ReferenceType::Manual, created.id)),
                        Some("Opening stock via import".to_string()),
                        Some(actor.to_string()),
                    )
                    .await
                    .map_err(RowError::Fatal)?;
                }
                report.imported += 1;
            }
        }
        Ok(())
    }

    async fn resolve_category(
        &self,
        txn: &DatabaseTransaction,
        row: &HashMap<String, String>,
        caches: &mut ReferenceCaches,
        report: &mut ImportReport,
    ) -> Result<Option<Uuid>, RowError> {
        let Some(name) = field(row, "category").or_else(|| field(row, "category_name")) else {
            return Ok(None);
        };
        if let Some(&id) = caches.categories.get(&name) {
            return Ok(Some(id));
        }
        let id = match category::Entity::find()
            .filter(category::Column::Name.eq(name.clone()))
            .one(txn)
            .await
            .map_err(|e| RowError::Fatal(e.into()))?
        {
            Some(existing) => existing.id,
            None => {
                let id = Uuid::new_v4();
                category::ActiveModel {
                    id: Set(id),
                    name: Set(name.clone()),
                    description: Set(None),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await
                .map_err(|e| RowError::Fatal(e.into()))?;
                report.created_categories += 1;
                id
            }
        };
        caches.categories.insert(name, id);
        Ok(Some(id))
    }

    async fn resolve_brand(
        &self,
        txn: &DatabaseTransaction,
        row: &HashMap<String, String>,
        caches: &mut ReferenceCaches,
        report: &mut ImportReport,
    ) -> Result<Option<Uuid>, RowError> {
        let Some(name) = field(row, "brand").or_else(|| field(row, "brand_name")) else {
            return Ok(None);
        };
        if let Some(&id) = caches.brands.get(&name) {
            return Ok(Some(id));
        }
        let id = match brand::Entity::find()
            .filter(brand::Column::Name.eq(name.clone()))
            .one(txn)
            .await
            .map_err(|e| RowError::Fatal(e.into()))?
        {
            Some(existing) => existing.id,
            None => {
                let id = Uuid::new_v4();
                brand::ActiveModel {
                    id: Set(id),
                    name: Set(name.clone()),
                    description: Set(None),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await
                .map_err(|e| RowError::Fatal(e.into()))?;
                report.created_brands += 1;
                id
            }
        };
        caches.brands.insert(name, id);
        Ok(Some(id))
    }

    async fn resolve_model(
        &self,
        txn: &DatabaseTransaction,
        row: &HashMap<String, String>,
        brand_id: Option<Uuid>,
        caches: &mut ReferenceCaches,
        report: &mut ImportReport,
    ) -> Result<Option<Uuid>, RowError> {
        let Some(brand_id) = brand_id else {
            return Ok(None);
        };
        let Some(name) = field(row, "model").or_else(|| field(row, "model_name")) else {
            return Ok(None);
        };
        let key = (brand_id, name.clone());
        if let Some(&id) = caches.models.get(&key) {
            return Ok(Some(id));
        }
        let id = match device_model::Entity::find()
            .filter(device_model::Column::Name.eq(name.clone()))
            .filter(device_model::Column::BrandId.eq(brand_id))
            .one(txn)
            .await
            .map_err(|e| RowError::Fatal(e.into()))?
        {
            Some(existing) => existing.id,
            None => {
                let id = Uuid::new_v4();
                device_model::ActiveModel {
                    id: Set(id),
                    name: Set(name.clone()),
                    brand_id: Set(brand_id),
                    description: Set(None),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await
                .map_err(|e| RowError::Fatal(e.into()))?;
                report.created_models += 1;
                id
            }
        };
        caches.models.insert(key, id);
        Ok(Some(id))
    }
}

/// Row-level problems are skippable; infrastructure failures are fatal and
/// roll the whole batch back.
enum RowError {
    Skippable(String),
    Fatal(ServiceError),
}

fn parse_rows(data: &[u8]) -> Result<Vec<HashMap<String, String>>, ServiceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ServiceError::ValidationError(format!("Unreadable file: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| ServiceError::ValidationError(format!("Unreadable row: {}", e)))?;
        let mut row = HashMap::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value.to_string());
        }
        rows.push(row);
    }
    Ok(rows)
}

fn field(row: &HashMap<String, String>, key: &str) -> Option<String> {
    row.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_price(row: &HashMap<String, String>, key: &str) -> Result<Option<f64>, RowError> {
    match field(row, key) {
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| RowError::Skippable(format!("Invalid number in {}: {}", key, raw))),
        None => Ok(None),
    }
}

fn parse_int(row: &HashMap<String, String>, key: &str) -> Result<Option<i32>, RowError> {
    match field(row, key) {
        Some(raw) => raw
            .parse::<i32>()
            .map(Some)
            .map_err(|_| RowError::Skippable(format!("Invalid integer in {}: {}", key, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_maps_headers() {
        let data = b"name,sku,cost_price\nPhone X,SKU1,100.5\n,SKU2,50\n";
        let rows = parse_rows(data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name").unwrap(), "Phone X");
        assert!(field(&rows[1], "name").is_none());
    }

    #[test]
    fn price_parsing_flags_garbage() {
        let data = b"name,cost_price\nPhone,abc\n";
        let rows = parse_rows(data).unwrap();
        assert!(parse_price(&rows[0], "cost_price").is_err());
    }
}
