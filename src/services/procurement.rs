//! Purchasing: purchase orders, receiving, and goods received notes.
//!
//! Receiving is the write-heavy path of the stock ledger: one transaction
//! covers the GRN, line updates, product resolution, stock increments,
//! movement appends and serial registration. Any failure rolls the whole
//! receipt back; partial receipts never persist.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::purchase_order::{PaymentStatus, PoStatus};
use crate::entities::stock_movement::{MovementType, ReferenceType};
use crate::entities::{
    damaged_item, grn, grn_item, product, purchase_order, purchase_order_item,
};
use crate::errors::ServiceError;
use crate::services::imei::insert_serial_in;
use crate::services::stock::record_movement;

/// Markup applied when a product is synthesized from a PO line.
const SELLING_PRICE_MARKUP: f64 = 1.2;
const MRP_MARKUP: f64 = 1.3;

#[derive(Debug, Clone)]
pub struct NewPurchaseOrderItem {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub category_id: Option<Uuid>,
    pub brand_id: Option<Uuid>,
    pub model_id: Option<Uuid>,
    pub quantity: i32,
    pub cost_price: f64,
}

#[derive(Debug, Clone)]
pub struct NewPurchaseOrder {
    pub po_number: String,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub total_amount: f64,
    pub notes: Option<String>,
    pub items: Vec<NewPurchaseOrderItem>,
}

#[derive(Debug, Clone)]
pub struct ReceiveLine {
    pub po_item_id: Uuid,
    pub received_quantity: i32,
    pub damaged_quantity: i32,
    pub damage_reason: Option<String>,
    pub imei_numbers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReceiveRequest {
    pub payment_status: Option<PaymentStatus>,
    pub storage_location: Option<String>,
    pub items: Vec<ReceiveLine>,
}

/// Result of a posted receipt.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiveOutcome {
    pub grn_id: Uuid,
    pub grn_number: String,
    pub status: String,
    pub total_ordered: i64,
    pub total_received: i64,
    pub damaged_count: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GrnDetail {
    #[serde(flatten)]
    pub grn: grn::Model,
    pub items: Vec<grn_item::Model>,
}

#[derive(Clone)]
pub struct ProcurementService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl ProcurementService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    #[instrument(skip(self, input))]
    pub async fn create_purchase_order(
        &self,
        input: NewPurchaseOrder,
        actor: &str,
    ) -> Result<purchase_order::Model, ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Purchase order needs at least one line item".to_string(),
            ));
        }
        for item in &input.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Line quantity must be positive for {}",
                    item.product_name
                )));
            }
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();

        let order = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set(input.po_number.clone()),
            supplier_name: Set(input.supplier_name),
            supplier_contact: Set(input.supplier_contact),
            order_date: Set(input.order_date),
            expected_delivery: Set(input.expected_delivery),
            status: Set(PoStatus::Pending.as_str().to_string()),
            payment_status: Set(PaymentStatus::Unpaid.as_str().to_string()),
            storage_location: Set(None),
            total_amount: Set(input.total_amount),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Purchase order"))?;

        for item in input.items {
            purchase_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                po_id: Set(order.id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name),
                category_id: Set(item.category_id),
                brand_id: Set(item.brand_id),
                model_id: Set(item.model_id),
                quantity: Set(item.quantity),
                cost_price: Set(item.cost_price),
                received_quantity: Set(0),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "purchase_order_created",
                format!("Created purchase order {} by {}", order.po_number, actor),
            )
            .target("purchase_order", order.id),
        );
        Ok(order)
    }

    pub async fn list_purchase_orders(&self) -> Result<Vec<purchase_order::Model>, ServiceError> {
        Ok(purchase_order::Entity::find()
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_purchase_order(
        &self,
        po_id: Uuid,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        let order = purchase_order::Entity::find_by_id(po_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", po_id))
            })?;

        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PoId.eq(po_id))
            .order_by_asc(purchase_order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(PurchaseOrderDetail { order, items })
    }

    /// Post a receipt against a purchase order. See module docs for the
    /// transactional contract.
    #[instrument(skip(self, request), fields(po_id = %po_id))]
    pub async fn receive_purchase_order(
        &self,
        po_id: Uuid,
        request: ReceiveRequest,
        actor: &str,
    ) -> Result<ReceiveOutcome, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let order = purchase_order::Entity::find_by_id(po_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", po_id))
            })?;

        let payment_status = request.payment_status.unwrap_or(PaymentStatus::Unpaid);
        let storage_location = request.storage_location.clone();

        let grn_number = generate_grn_number(now.date_naive());
        let grn_row = grn::ActiveModel {
            id: Set(Uuid::new_v4()),
            grn_number: Set(grn_number.clone()),
            po_id: Set(order.id),
            po_number: Set(order.po_number.clone()),
            supplier_name: Set(order.supplier_name.clone()),
            received_date: Set(now),
            total_items: Set(0),
            total_quantity: Set(0),
            payment_status: Set(payment_status.as_str().to_string()),
            storage_location: Set(storage_location.clone()),
            notes: Set(None),
            created_by: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut total_items = 0;
        let mut total_quantity = 0;
        let mut damaged_count = 0;

        for line in &request.items {
            if line.received_quantity < 0 || line.damaged_quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "Received and damaged quantities cannot be negative".to_string(),
                ));
            }
            // Lines with nothing to post are skipped, not errors.
            if line.received_quantity == 0 && line.damaged_quantity == 0 {
                continue;
            }

            // Unknown line ids are skipped the same way.
            let Some(po_item) = purchase_order_item::Entity::find_by_id(line.po_item_id)
                .filter(purchase_order_item::Column::PoId.eq(po_id))
                .one(&txn)
                .await?
            else {
                continue;
            };

            let landed = line.received_quantity + line.damaged_quantity;
            let new_received = po_item.received_quantity + landed;
            if new_received > po_item.quantity {
                // Over-receipt is tolerated, but not silent.
                warn!(
                    po_item = %po_item.id,
                    ordered = po_item.quantity,
                    received = new_received,
                    "over-receipt on purchase order line"
                );
            }

            purchase_order_item::Entity::update(purchase_order_item::ActiveModel {
                id: Set(po_item.id),
                received_quantity: Set(new_received),
                ..Default::default()
            })
            .exec(&txn)
            .await?;

            grn_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                grn_id: Set(grn_row.id),
                product_id: Set(po_item.product_id),
                product_name: Set(po_item.product_name.clone()),
                quantity_received: Set(line.received_quantity),
                quantity_damaged: Set(line.damaged_quantity),
                damage_reason: Set(line.damage_reason.clone()),
                cost_price: Set(po_item.cost_price),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            total_items += 1;
            total_quantity += line.received_quantity;

            if line.damaged_quantity > 0 {
                damaged_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    po_id: Set(po_id),
                    po_item_id: Set(po_item.id),
                    product_name: Set(po_item.product_name.clone()),
                    quantity: Set(line.damaged_quantity),
                    damage_reason: Set(line.damage_reason.clone()),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await?;
                damaged_count += 1;
            }

            // Damaged units never enter saleable stock.
            if line.received_quantity == 0 {
                continue;
            }

            let product_id = self
                .resolve_receiving_product(&txn, &po_item, line.received_quantity, &storage_location)
                .await?;

            let movement = record_movement(
                &txn,
                product_id,
                MovementType::Purchase,
                line.received_quantity,
                Some((ReferenceType::PurchaseOrder, po_id)),
                Some(format!("Received against PO {}", order.po_number)),
                Some(actor.to_string()),
            )
            .await?;

            for serial in &line.imei_numbers {
                insert_serial_in(
                    &txn,
                    product_id,
                    serial,
                    crate::entities::product_imei::ImeiStatus::Available,
                    Some(grn_row.id),
                    Some(movement.id),
                    None,
                )
                .await?;
            }
        }

        // Derive the PO status from the order totals.
        let all_items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PoId.eq(po_id))
            .all(&txn)
            .await?;
        let total_ordered: i64 = all_items.iter().map(|i| i.quantity as i64).sum();
        let total_received: i64 = all_items.iter().map(|i| i.received_quantity as i64).sum();
        let new_status = PoStatus::derive(total_ordered, total_received);

        purchase_order::Entity::update(purchase_order::ActiveModel {
            id: Set(po_id),
            status: Set(new_status.as_str().to_string()),
            payment_status: Set(payment_status.as_str().to_string()),
            storage_location: Set(storage_location),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        grn::Entity::update(grn::ActiveModel {
            id: Set(grn_row.id),
            total_items: Set(total_items),
            total_quantity: Set(total_quantity),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "purchase_order_received",
                format!(
                    "Received {} against PO {} by {}",
                    grn_number, order.po_number, actor
                ),
            )
            .target("grn", grn_row.id),
        );

        Ok(ReceiveOutcome {
            grn_id: grn_row.id,
            grn_number,
            status: new_status.as_str().to_string(),
            total_ordered,
            total_received,
            damaged_count,
        })
    }

    pub async fn list_grns(&self) -> Result<Vec<grn::Model>, ServiceError> {
        Ok(grn::Entity::find()
            .order_by_desc(grn::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_grn(&self, grn_id: Uuid) -> Result<GrnDetail, ServiceError> {
        let header = grn::Entity::find_by_id(grn_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("GRN {} not found", grn_id)))?;

        let items = grn_item::Entity::find()
            .filter(grn_item::Column::GrnId.eq(grn_id))
            .order_by_asc(grn_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(GrnDetail { grn: header, items })
    }

    /// Resolve the product a receipt line lands on.
    ///
    /// Live reference → increment its stock. Dangling or absent reference →
    /// synthesize a product from the line's descriptive fields and retro-fit
    /// the line.
    async fn resolve_receiving_product(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        po_item: &purchase_order_item::Model,
        received_quantity: i32,
        storage_location: &Option<String>,
    ) -> Result<Uuid, ServiceError> {
        if let Some(product_id) = po_item.product_id {
            if let Some(existing) = product::Entity::find_by_id(product_id).one(txn).await? {
                let mut update = product::ActiveModel {
                    id: Set(existing.id),
                    current_stock: Set(existing.current_stock + received_quantity),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                };
                if storage_location.is_some() {
                    update.storage_location = Set(storage_location.clone());
                }
                product::Entity::update(update).exec(txn).await?;
                return Ok(existing.id);
            }
        }

        // Product deleted since ordering (or never referenced): create it.
        let now = Utc::now();
        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(None),
            name: Set(po_item.product_name.clone()),
            category_id: Set(po_item.category_id),
            brand_id: Set(po_item.brand_id),
            model_id: Set(po_item.model_id),
            description: Set(None),
            cost_price: Set(po_item.cost_price),
            selling_price: Set(round2(po_item.cost_price * SELLING_PRICE_MARKUP)),
            mrp: Set(round2(po_item.cost_price * MRP_MARKUP)),
            opening_stock: Set(received_quantity),
            current_stock: Set(received_quantity),
            min_stock_level: Set(10),
            storage_location: Set(storage_location.clone()),
            color: Set(None),
            storage_capacity: Set(None),
            ram: Set(None),
            warranty_period: Set(None),
            supplier_name: Set(None),
            supplier_contact: Set(None),
            status: Set(product::ProductStatus::Active.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await?;

        purchase_order_item::Entity::update(purchase_order_item::ActiveModel {
            id: Set(po_item.id),
            product_id: Set(Some(created.id)),
            ..Default::default()
        })
        .exec(txn)
        .await?;

        Ok(created.id)
    }
}

/// Collision-free GRN identifier: date prefix for readability, uuid suffix
/// behind the unique index for safety under concurrent receiving.
fn generate_grn_number(date: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("GRN-{}-{}", date.format("%Y%m%d"), &suffix[..8])
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grn_numbers_are_unique_per_call() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let a = generate_grn_number(date);
        let b = generate_grn_number(date);
        assert!(a.starts_with("GRN-20250601-"));
        assert_ne!(a, b);
    }

    #[test]
    fn markup_rounding() {
        assert_eq!(round2(99.999), 100.0);
        assert_eq!(round2(10.0 * SELLING_PRICE_MARKUP), 12.0);
        assert_eq!(round2(10.0 * MRP_MARKUP), 13.0);
    }
}
