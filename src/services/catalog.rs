//! Catalog management: categories, brands, device models and products.
//!
//! Product stock is only mutated through movement-producing paths: creation
//! seeds the opening movement, and a direct stock edit synthesizes a
//! corrective adjustment.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
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

/// Filters accepted by the product listing.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub status: Option<String>,
    /// "low" or "out"
    pub stock_status: Option<String>,
}

/// Product joined with its reference names for list/detail responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: product::Model,
    pub category_name: Option<String>,
    pub brand_name: Option<String>,
    pub model_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: Option<String>,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub description: Option<String>,
    pub cost_price: f64,
    pub selling_price: f64,
    pub mrp: f64,
    pub opening_stock: i32,
    pub min_stock_level: i32,
    pub storage_location: Option<String>,
    pub color: Option<String>,
    pub storage_capacity: Option<String>,
    pub ram: Option<String>,
    pub warranty_period: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub status: product::ProductStatus,
}

#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub description: Option<String>,
    pub cost_price: f64,
    pub selling_price: f64,
    pub mrp: f64,
    /// When set and different from the stored value, a corrective
    /// adjustment movement is recorded.
    pub current_stock: Option<i32>,
    pub min_stock_level: i32,
    pub storage_location: Option<String>,
    pub color: Option<String>,
    pub storage_capacity: Option<String>,
    pub ram: Option<String>,
    pub warranty_period: Option<String>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub status: product::ProductStatus,
}

/// Field subset allowed in bulk product updates.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct BulkProductUpdate {
    pub category_id: Option<Uuid>,
    pub status: Option<String>,
    pub selling_price: Option<f64>,
    pub cost_price: Option<f64>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    // -- categories ---------------------------------------------------------

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
        actor: &str,
    ) -> Result<category::Model, ServiceError> {
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            description: Set(description),
            created_at: Set(Utc::now()),
        };
        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "Category"))?;

        self.audit.record(
            AuditEntry::new(
                None,
                "category_created",
                format!("Created category {} by {}", name, actor),
            )
            .target("category", created.id),
        );
        Ok(created)
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<(), ServiceError> {
        self.find_category(id).await?;
        category::Entity::update(category::ActiveModel {
            id: Set(id),
            name: Set(name),
            description: Set(description),
            ..Default::default()
        })
        .exec(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Category"))?;
        Ok(())
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        self.find_category(id).await?;
        category::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "category"))?;
        Ok(())
    }

    async fn find_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    // -- brands -------------------------------------------------------------

    pub async fn list_brands(&self) -> Result<Vec<brand::Model>, ServiceError> {
        Ok(brand::Entity::find()
            .order_by_asc(brand::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_brand(
        &self,
        name: String,
        description: Option<String>,
        actor: &str,
    ) -> Result<brand::Model, ServiceError> {
        let created = brand::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            description: Set(description),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Brand"))?;

        self.audit.record(
            AuditEntry::new(
                None,
                "brand_created",
                format!("Created brand {} by {}", name, actor),
            )
            .target("brand", created.id),
        );
        Ok(created)
    }

    pub async fn update_brand(
        &self,
        id: Uuid,
        name: String,
        description: Option<String>,
    ) -> Result<(), ServiceError> {
        brand::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", id)))?;
        brand::Entity::update(brand::ActiveModel {
            id: Set(id),
            name: Set(name),
            description: Set(description),
            ..Default::default()
        })
        .exec(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Brand"))?;
        Ok(())
    }

    pub async fn delete_brand(&self, id: Uuid) -> Result<(), ServiceError> {
        brand::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", id)))?;
        brand::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "brand"))?;
        Ok(())
    }

    // -- device models ------------------------------------------------------

    /// Device models with their brand names, ordered by brand then name.
    pub async fn list_device_models(
        &self,
    ) -> Result<Vec<(device_model::Model, Option<String>)>, ServiceError> {
        let rows = device_model::Entity::find()
            .find_also_related(brand::Entity)
            .order_by_asc(device_model::Column::Name)
            .all(&*self.db)
            .await?;
        let mut rows: Vec<(device_model::Model, Option<String>)> = rows
            .into_iter()
            .map(|(m, b)| (m, b.map(|b| b.name)))
            .collect();
        rows.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.name.cmp(&b.0.name)));
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn create_device_model(
        &self,
        name: String,
        brand_id: Uuid,
        description: Option<String>,
    ) -> Result<device_model::Model, ServiceError> {
        brand::Entity::find_by_id(brand_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Brand {} not found", brand_id)))?;

        device_model::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            brand_id: Set(brand_id),
            description: Set(description),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Model"))
    }

    pub async fn update_device_model(
        &self,
        id: Uuid,
        name: String,
        brand_id: Uuid,
        description: Option<String>,
    ) -> Result<(), ServiceError> {
        device_model::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Model {} not found", id)))?;
        device_model::Entity::update(device_model::ActiveModel {
            id: Set(id),
            name: Set(name),
            brand_id: Set(brand_id),
            description: Set(description),
            ..Default::default()
        })
        .exec(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Model"))?;
        Ok(())
    }

    pub async fn delete_device_model(&self, id: Uuid) -> Result<(), ServiceError> {
        device_model::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Model {} not found", id)))?;
        device_model::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "model"))?;
        Ok(())
    }

    // -- products -----------------------------------------------------------

    /// Create a product; a positive opening stock seeds the ledger.
    #[instrument(skip(self, input))]
    pub async fn create_product(
        &self,
        input: NewProduct,
        actor: &str,
    ) -> Result<product::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(input.sku),
            name: Set(input.name),
            category_id: Set(input.category_id),
            brand_id: Set(input.brand_id),
            model_id: Set(input.model_id),
            description: Set(input.description),
            cost_price: Set(input.cost_price),
            selling_price: Set(input.selling_price),
            mrp: Set(input.mrp),
            opening_stock: Set(input.opening_stock),
            current_stock: Set(input.opening_stock),
            min_stock_level: Set(input.min_stock_level),
            storage_location: Set(input.storage_location),
            color: Set(input.color),
            storage_capacity: Set(input.storage_capacity),
            ram: Set(input.ram),
            warranty_period: Set(input.warranty_period),
            supplier_name: Set(input.supplier_name),
            supplier_contact: Set(input.supplier_contact),
            status: Set(input.status.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Product"))?;

        if input.opening_stock > 0 {
            record_movement(
                &txn,
                created.id,
                MovementType::OpeningStock,
                input.opening_stock,
                Some((ReferenceType::Manual, created.id)),
                Some("Opening stock".to_string()),
                Some(actor.to_string()),
            )
            .await?;
        }

        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "product_created",
                format!("Created product {}", created.name),
            )
            .target("product", created.id),
        );

        Ok(created)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductView, ServiceError> {
        let item = product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        let mut views = self.with_reference_names(vec![item]).await?;
        Ok(views.remove(0))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductView>, ServiceError> {
        let mut query = product::Entity::find();

        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.like(pattern.clone()))
                    .add(product::Column::Sku.like(pattern.clone()))
                    .add(product::Column::Description.like(pattern)),
            );
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(brand_id) = filter.brand_id {
            query = query.filter(product::Column::BrandId.eq(brand_id));
        }
        if let Some(model_id) = filter.model_id {
            query = query.filter(product::Column::ModelId.eq(model_id));
        }
        if let Some(status) = filter.status.filter(|s| !s.is_empty()) {
            query = query.filter(product::Column::Status.eq(status));
        }
        match filter.stock_status.as_deref() {
            Some("low") => {
                query = query.filter(
                    Expr::col(product::Column::CurrentStock)
                        .lte(Expr::col(product::Column::MinStockLevel)),
                );
            }
            Some("out") => {
                query = query.filter(product::Column::CurrentStock.eq(0));
            }
            _ => {}
        }

        let items = query
            .order_by_desc(product::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.with_reference_names(items).await
    }

    /// Update a product. A changed `current_stock` becomes a corrective
    /// adjustment movement so the ledger stays authoritative.
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: ProductUpdate,
        actor: &str,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let existing = product::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;

        let new_stock = input.current_stock.unwrap_or(existing.current_stock);
        let stock_diff = new_stock - existing.current_stock;

        product::Entity::update(product::ActiveModel {
            id: Set(id),
            sku: Set(input.sku),
            name: Set(input.name),
            category_id: Set(input.category_id),
            brand_id: Set(input.brand_id),
            model_id: Set(input.model_id),
            description: Set(input.description),
            cost_price: Set(input.cost_price),
            selling_price: Set(input.selling_price),
            mrp: Set(input.mrp),
            current_stock: Set(new_stock),
            min_stock_level: Set(input.min_stock_level),
            storage_location: Set(input.storage_location),
            color: Set(input.color),
            storage_capacity: Set(input.storage_capacity),
            ram: Set(input.ram),
            warranty_period: Set(input.warranty_period),
            supplier_name: Set(input.supplier_name),
            supplier_contact: Set(input.supplier_contact),
            status: Set(input.status.as_str().to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&txn)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Product"))?;

        if stock_diff != 0 {
            record_movement(
                &txn,
                id,
                MovementType::Adjustment,
                stock_diff,
                Some((ReferenceType::Manual, id)),
                Some("Stock adjustment via edit".to_string()),
                Some(actor.to_string()),
            )
            .await?;
        }

        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(None, "product_updated", format!("Updated product {}", id))
                .target("product", id),
        );
        Ok(())
    }

    pub async fn delete_product(&self, id: Uuid, actor: &str) -> Result<(), ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        product::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "product"))?;

        self.audit.record(
            AuditEntry::new(
                None,
                "product_deleted",
                format!("Deleted product {} by {}", id, actor),
            )
            .target("product", id),
        );
        Ok(())
    }

    /// Delete a set of products; returns how many rows went away.
    pub async fn bulk_delete_products(
        &self,
        ids: Vec<Uuid>,
        actor: &str,
    ) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = product::Entity::delete_many()
            .filter(product::Column::Id.is_in(ids.clone()))
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "product"))?;

        self.audit.record(AuditEntry::new(
            None,
            "products_bulk_deleted",
            format!("Bulk-deleted {} products by {}", result.rows_affected, actor),
        ));
        Ok(result.rows_affected)
    }

    /// Apply a field subset to a set of products.
    pub async fn bulk_update_products(
        &self,
        ids: Vec<Uuid>,
        updates: BulkProductUpdate,
        actor: &str,
    ) -> Result<u64, ServiceError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut update = product::Entity::update_many()
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.is_in(ids));

        let mut touched = false;
        if let Some(category_id) = updates.category_id {
            update = update.col_expr(product::Column::CategoryId, Expr::value(category_id));
            touched = true;
        }
        if let Some(status) = updates.status {
            product::ProductStatus::parse(&status).ok_or_else(|| {
                ServiceError::ValidationError(format!("Invalid status: {}", status))
            })?;
            update = update.col_expr(product::Column::Status, Expr::value(status));
            touched = true;
        }
        if let Some(selling_price) = updates.selling_price {
            update = update.col_expr(product::Column::SellingPrice, Expr::value(selling_price));
            touched = true;
        }
        if let Some(cost_price) = updates.cost_price {
            update = update.col_expr(product::Column::CostPrice, Expr::value(cost_price));
            touched = true;
        }

        if !touched {
            return Ok(0);
        }

        let result = update.exec(&*self.db).await?;
        self.audit.record(AuditEntry::new(
            None,
            "products_bulk_updated",
            format!("Bulk-updated {} products by {}", result.rows_affected, actor),
        ));
        Ok(result.rows_affected)
    }

    async fn with_reference_names(
        &self,
        items: Vec<product::Model>,
    ) -> Result<Vec<ProductView>, ServiceError> {
        let db = &*self.db;
        let categories: HashMap<Uuid, String> = category::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let brands: HashMap<Uuid, String> = brand::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();
        let models: HashMap<Uuid, String> = device_model::Entity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        Ok(items
            .into_iter()
            .map(|p| ProductView {
                category_name: p.category_id.and_then(|id| categories.get(&id).cloned()),
                brand_name: p.brand_id.and_then(|id| brands.get(&id).cloned()),
                model_name: p.model_id.and_then(|id| models.get(&id).cloned()),
                product: p,
            })
            .collect())
    }
}
