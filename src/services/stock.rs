//! Stock ledger: movement recording, guarded stock mutation, and the
//! running-balance history reconstructor.
//!
//! Movements store SIGNED quantities; `Product::current_stock` is only ever
//! changed together with an appended movement, inside the caller's
//! transaction.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::stock_movement::{MovementType, ReferenceType};
use crate::entities::{grn, pos_sale, product, purchase_order, stock_movement};
use crate::errors::ServiceError;

/// Append a movement row. Callers pass the signed quantity.
pub(crate) async fn record_movement<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    movement_type: MovementType,
    quantity: i32,
    reference: Option<(ReferenceType, Uuid)>,
    notes: Option<String>,
    created_by: Option<String>,
) -> Result<stock_movement::Model, ServiceError> {
    let model = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        movement_type: Set(movement_type.as_str().to_string()),
        quantity: Set(quantity),
        reference_type: Set(reference.map(|(t, _)| t.as_str().to_string())),
        reference_id: Set(reference.map(|(_, id)| id)),
        notes: Set(notes),
        created_by: Set(created_by),
        created_at: Set(Utc::now()),
    };
    Ok(model.insert(conn).await?)
}

/// Apply a signed delta to `current_stock` with a conditional update.
///
/// For negative deltas the update is guarded by `current_stock >= |delta|`;
/// zero rows affected then means insufficient stock (or a vanished product),
/// and the caller's transaction must abort.
pub(crate) async fn apply_stock_delta<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    delta: i32,
) -> Result<(), ServiceError> {
    let mut update = product::Entity::update_many()
        .col_expr(
            product::Column::CurrentStock,
            Expr::col(product::Column::CurrentStock).add(delta),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id));

    if delta < 0 {
        update = update.filter(product::Column::CurrentStock.gte(-delta));
    }

    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        let exists = product::Entity::find_by_id(product_id).one(conn).await?;
        return match exists {
            Some(p) => Err(ServiceError::InsufficientStock(format!(
                "Insufficient stock for product {}: requested {}, available {}",
                p.name,
                -delta,
                p.current_stock
            ))),
            None => Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            ))),
        };
    }
    Ok(())
}

/// One row of the reconstructed stock history.
#[derive(Debug, Serialize, ToSchema)]
pub struct StockHistoryEntry {
    pub date_time: DateTime<Utc>,
    pub stock_added: i32,
    pub stock_removed: i32,
    pub reference: String,
    pub recorded_by: String,
    pub running_balance: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockHistory {
    pub product_name: String,
    pub history: Vec<StockHistoryEntry>,
}

#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl StockService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Reconstruct the chronological running balance for a product.
    ///
    /// The balance is seeded at `opening_stock`; opening rows are displayed
    /// but not re-applied. The displayed balance is clamped at zero.
    #[instrument(skip(self))]
    pub async fn stock_history(&self, product_id: Uuid) -> Result<StockHistory, ServiceError> {
        let db = &*self.db;

        let item = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let movements = stock_movement::Entity::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_asc(stock_movement::Column::CreatedAt)
            .all(db)
            .await?;

        let reference_labels = self.reference_labels(&movements).await?;

        let mut running_balance = item.opening_stock;
        let mut history = Vec::with_capacity(movements.len());

        for movement in movements {
            let movement_type =
                MovementType::parse(&movement.movement_type).ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "unknown movement type in ledger: {}",
                        movement.movement_type
                    ))
                })?;

            let quantity = movement.quantity;
            let (stock_added, stock_removed) = match movement_type {
                // The seed already contains the opening quantity.
                MovementType::OpeningStock => (quantity.abs(), 0),
                MovementType::Purchase
                | MovementType::Adjustment
                | MovementType::Sale
                | MovementType::Return
                | MovementType::Exchange
                | MovementType::Damage => {
                    if quantity >= 0 {
                        running_balance += quantity;
                        (quantity, 0)
                    } else {
                        running_balance += quantity;
                        (0, -quantity)
                    }
                }
            };

            let reference = match movement
                .reference_type
                .as_deref()
                .and_then(ReferenceType::parse)
            {
                Some(ReferenceType::Manual) => "Manual Entry".to_string(),
                Some(_) => movement
                    .reference_id
                    .and_then(|id| reference_labels.get(&id).cloned())
                    .unwrap_or_else(|| "System".to_string()),
                None => movement
                    .reference_type
                    .clone()
                    .unwrap_or_else(|| "System".to_string()),
            };

            history.push(StockHistoryEntry {
                date_time: movement.created_at,
                stock_added,
                stock_removed,
                reference,
                recorded_by: movement
                    .created_by
                    .clone()
                    .unwrap_or_else(|| "System".to_string()),
                running_balance: running_balance.max(0),
            });
        }

        Ok(StockHistory {
            product_name: item.name,
            history,
        })
    }

    /// Manual stock adjustment: guarded delta plus an `adjustment` movement.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        delta: i32,
        notes: Option<String>,
        actor: &str,
    ) -> Result<stock_movement::Model, ServiceError> {
        use sea_orm::TransactionTrait;

        if delta == 0 {
            return Err(ServiceError::ValidationError(
                "Adjustment quantity must be non-zero".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        apply_stock_delta(&txn, product_id, delta).await?;
        let movement = record_movement(
            &txn,
            product_id,
            MovementType::Adjustment,
            delta,
            None,
            notes.or_else(|| Some("Manual stock adjustment".to_string())),
            Some(actor.to_string()),
        )
        .await?;
        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "stock_adjustment",
                format!("Adjusted stock of product {} by {}", product_id, delta),
            )
            .target("product", product_id),
        );

        Ok(movement)
    }

    /// Write off damaged units: guarded negative delta plus a `damage`
    /// movement.
    #[instrument(skip(self))]
    pub async fn record_damage(
        &self,
        product_id: Uuid,
        quantity: i32,
        reason: Option<String>,
        actor: &str,
    ) -> Result<stock_movement::Model, ServiceError> {
        use sea_orm::TransactionTrait;

        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Damage quantity must be positive".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        apply_stock_delta(&txn, product_id, -quantity).await?;
        let movement = record_movement(
            &txn,
            product_id,
            MovementType::Damage,
            -quantity,
            None,
            reason,
            Some(actor.to_string()),
        )
        .await?;
        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "stock_damage",
                format!("Wrote off {} damaged units of product {}", quantity, product_id),
            )
            .target("product", product_id),
        );

        Ok(movement)
    }

    /// Resolve human-readable labels for movement references.
    async fn reference_labels(
        &self,
        movements: &[stock_movement::Model],
    ) -> Result<HashMap<Uuid, String>, ServiceError> {
        let db = &*self.db;
        let mut po_ids = Vec::new();
        let mut grn_ids = Vec::new();
        let mut sale_ids = Vec::new();

        for m in movements {
            let Some(id) = m.reference_id else { continue };
            match m.reference_type.as_deref().and_then(ReferenceType::parse) {
                Some(ReferenceType::PurchaseOrder) => po_ids.push(id),
                Some(ReferenceType::Grn) => grn_ids.push(id),
                Some(ReferenceType::PosSale) => sale_ids.push(id),
                _ => {}
            }
        }

        let mut labels = HashMap::new();
        if !po_ids.is_empty() {
            for po in purchase_order::Entity::find()
                .filter(purchase_order::Column::Id.is_in(po_ids))
                .all(db)
                .await?
            {
                labels.insert(po.id, format!("PO-{}", po.po_number));
            }
        }
        if !grn_ids.is_empty() {
            for g in grn::Entity::find()
                .filter(grn::Column::Id.is_in(grn_ids))
                .all(db)
                .await?
            {
                labels.insert(g.id, g.grn_number);
            }
        }
        if !sale_ids.is_empty() {
            for s in pos_sale::Entity::find()
                .filter(pos_sale::Column::Id.is_in(sale_ids))
                .all(db)
                .await?
            {
                labels.insert(s.id, s.invoice_number);
            }
        }
        Ok(labels)
    }
}
