//! POS transaction composer: sale, return and exchange.
//!
//! One transaction covers the customer upsert, the sale header and lines,
//! guarded stock mutation, ledger appends and IMEI transitions. Any
//! validation failure or lost IMEI race rolls everything back, including
//! newly created sold serials and the upsert.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::pos_sale::TransactionType;
use crate::entities::product_imei::{self, ImeiStatus};
use crate::entities::stock_movement::{MovementType, ReferenceType};
use crate::entities::{customer, pos_sale, pos_sale_item, product};
use crate::errors::ServiceError;
use crate::services::imei::{insert_serial_in, mark_returned_in, mark_sold_in, validate_serial};
use crate::services::stock::{apply_stock_delta, record_movement};

#[derive(Debug, Clone)]
pub struct PosCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One line of a POS request. At most one serial-supply mode may be used:
/// existing inventory serials (`imei_ids`) or freshly entered ones
/// (`new_serials`).
#[derive(Debug, Clone)]
pub struct PosLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: f64,
    pub imei_ids: Vec<Uuid>,
    pub new_serials: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PosRequest {
    pub transaction_type: TransactionType,
    pub customer: Option<PosCustomer>,
    pub items: Vec<PosLine>,
    pub discount_percent: f64,
    pub tax_percent: f64,
    pub payment_method: String,
    pub original_sale_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: pos_sale::Model,
    pub items: Vec<pos_sale_item::Model>,
}

#[derive(Clone)]
pub struct PosService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl PosService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Compose and persist a POS transaction.
    #[instrument(skip(self, request), fields(kind = request.transaction_type.as_str()))]
    pub async fn create_transaction(
        &self,
        request: PosRequest,
        actor: &str,
    ) -> Result<SaleDetail, ServiceError> {
        validate_request(&request)?;

        let txn = self.db.begin().await?;
        let now = Utc::now();

        if let Some(original_sale_id) = request.original_sale_id {
            pos_sale::Entity::find_by_id(original_sale_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "Original sale {} not found",
                        original_sale_id
                    ))
                })?;
        }

        // Customer upsert happens before item processing, inside the same
        // transaction, so it rolls back with everything else.
        let customer_id = match &request.customer {
            Some(info) => self.upsert_customer(&txn, info).await?,
            None => None,
        };

        let subtotal: f64 = request
            .items
            .iter()
            .map(|line| line.quantity as f64 * line.unit_price)
            .sum();
        let subtotal = round2(subtotal);
        let discount_amount = round2(subtotal * request.discount_percent / 100.0);
        let taxable = subtotal - discount_amount;
        let tax_amount = round2(taxable * request.tax_percent / 100.0);
        let total = round2(taxable + tax_amount);

        // Returns store negative magnitudes.
        let (stored_subtotal, stored_total) = match request.transaction_type {
            TransactionType::Return => (-subtotal, -total),
            TransactionType::Sale | TransactionType::Exchange => (subtotal, total),
        };

        let sale = pos_sale::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_number: Set(generate_invoice_number(request.transaction_type)),
            transaction_type: Set(request.transaction_type.as_str().to_string()),
            customer_id: Set(customer_id),
            original_sale_id: Set(request.original_sale_id),
            subtotal: Set(stored_subtotal),
            discount_percent: Set(request.discount_percent),
            discount_amount: Set(discount_amount),
            tax_percent: Set(request.tax_percent),
            tax_amount: Set(tax_amount),
            total: Set(stored_total),
            payment_method: Set(request.payment_method.clone()),
            notes: Set(request.notes.clone()),
            created_by: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let item = self
                .process_line(&txn, &sale, request.transaction_type, line, actor)
                .await?;
            items.push(item);
        }

        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "pos_transaction",
                format!(
                    "Recorded {} {} by {}",
                    sale.transaction_type, sale.invoice_number, actor
                ),
            )
            .target("pos_sale", sale.id),
        );

        Ok(SaleDetail { sale, items })
    }

    pub async fn list_sales(&self) -> Result<Vec<pos_sale::Model>, ServiceError> {
        Ok(pos_sale::Entity::find()
            .order_by_desc(pos_sale::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleDetail, ServiceError> {
        let sale = pos_sale::Entity::find_by_id(sale_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;
        let items = pos_sale_item::Entity::find()
            .filter(pos_sale_item::Column::SaleId.eq(sale_id))
            .all(&*self.db)
            .await?;
        Ok(SaleDetail { sale, items })
    }

    /// Insert-or-refresh a customer by phone. Customers without a phone are
    /// always inserted fresh.
    async fn upsert_customer(
        &self,
        txn: &DatabaseTransaction,
        info: &PosCustomer,
    ) -> Result<Option<Uuid>, ServiceError> {
        let now = Utc::now();

        if let Some(phone) = info.phone.as_deref().filter(|p| !p.is_empty()) {
            if let Some(existing) = customer::Entity::find()
                .filter(customer::Column::Phone.eq(phone))
                .one(txn)
                .await?
            {
                customer::Entity::update(customer::ActiveModel {
                    id: Set(existing.id),
                    name: Set(info.name.clone()),
                    email: Set(info.email.clone().or(existing.email)),
                    updated_at: Set(now),
                    ..Default::default()
                })
                .exec(txn)
                .await?;
                return Ok(Some(existing.id));
            }
        }

        let created = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(info.name.clone()),
            phone: Set(info.phone.clone().filter(|p| !p.is_empty())),
            email: Set(info.email.clone()),
            address: Set(None),
            city: Set(None),
            gstin: Set(None),
            notes: Set(None),
            status: Set("active".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Customer"))?;

        Ok(Some(created.id))
    }

    async fn process_line(
        &self,
        txn: &DatabaseTransaction,
        sale: &pos_sale::Model,
        kind: TransactionType,
        line: &PosLine,
        actor: &str,
    ) -> Result<pos_sale_item::Model, ServiceError> {
        let item = product::Entity::find_by_id(line.product_id)
            .one(txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", line.product_id))
            })?;

        // Resolve serial strings for the line snapshot before transitions.
        let mut serial_snapshot: Vec<String> = Vec::new();

        if !line.imei_ids.is_empty() {
            let rows = product_imei::Entity::find()
                .filter(product_imei::Column::Id.is_in(line.imei_ids.clone()))
                .all(txn)
                .await?;
            if rows.len() != line.imei_ids.len() {
                return Err(ServiceError::NotFound(
                    "One or more selected IMEIs do not exist".to_string(),
                ));
            }
            for row in &rows {
                if row.product_id != line.product_id {
                    return Err(ServiceError::ValidationError(format!(
                        "IMEI {} does not belong to product {}",
                        row.imei, item.name
                    )));
                }
                serial_snapshot.push(row.imei.clone());
            }
        }

        let (movement_type, stock_delta) = match kind {
            TransactionType::Sale => (MovementType::Sale, -line.quantity),
            TransactionType::Exchange => (MovementType::Exchange, -line.quantity),
            TransactionType::Return => (MovementType::Return, line.quantity),
        };

        // Insufficient stock aborts the whole transaction here.
        apply_stock_delta(txn, line.product_id, stock_delta).await?;

        let movement = record_movement(
            txn,
            line.product_id,
            movement_type,
            stock_delta,
            Some((ReferenceType::PosSale, sale.id)),
            Some(format!("{} {}", sale.transaction_type, sale.invoice_number)),
            Some(actor.to_string()),
        )
        .await?;

        match kind {
            TransactionType::Sale | TransactionType::Exchange => {
                mark_sold_in(txn, &line.imei_ids, sale.id).await?;
                for serial in &line.new_serials {
                    // Freshly entered serials enter inventory already sold.
                    insert_serial_in(
                        txn,
                        line.product_id,
                        serial,
                        ImeiStatus::Sold,
                        None,
                        Some(movement.id),
                        Some(sale.id),
                    )
                    .await?;
                    serial_snapshot.push(serial.clone());
                }
            }
            TransactionType::Return => {
                mark_returned_in(txn, &line.imei_ids).await?;
            }
        }

        let line_total = round2(line.quantity as f64 * line.unit_price);
        let imei_numbers = if serial_snapshot.is_empty() {
            None
        } else {
            Some(serial_snapshot.join(","))
        };

        Ok(pos_sale_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale.id),
            product_id: Set(line.product_id),
            product_name: Set(item.name),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_total: Set(line_total),
            imei_numbers: Set(imei_numbers),
            created_at: Set(Utc::now()),
        }
        .insert(txn)
        .await?)
    }
}

fn validate_request(request: &PosRequest) -> Result<(), ServiceError> {
    if request.items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Transaction needs at least one line item".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&request.discount_percent) {
        return Err(ServiceError::ValidationError(
            "Discount percent must be between 0 and 100".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&request.tax_percent) {
        return Err(ServiceError::ValidationError(
            "Tax percent must be between 0 and 100".to_string(),
        ));
    }

    let mut seen_serials: HashSet<&str> = HashSet::new();
    for line in &request.items {
        if line.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Line quantity must be positive".to_string(),
            ));
        }
        if !line.imei_ids.is_empty() && !line.new_serials.is_empty() {
            return Err(ServiceError::ValidationError(
                "A line may use selected IMEIs or new serials, not both".to_string(),
            ));
        }
        if !line.imei_ids.is_empty() && line.imei_ids.len() != line.quantity as usize {
            return Err(ServiceError::ValidationError(format!(
                "Selected IMEI count ({}) must equal quantity ({})",
                line.imei_ids.len(),
                line.quantity
            )));
        }
        if !line.new_serials.is_empty() {
            if request.transaction_type == TransactionType::Return {
                return Err(ServiceError::ValidationError(
                    "New serials cannot be registered on a return".to_string(),
                ));
            }
            if line.new_serials.len() != line.quantity as usize {
                return Err(ServiceError::ValidationError(format!(
                    "Serial count ({}) must equal quantity ({})",
                    line.new_serials.len(),
                    line.quantity
                )));
            }
            for serial in &line.new_serials {
                validate_serial(serial)?;
                if !seen_serials.insert(serial.as_str()) {
                    return Err(ServiceError::ValidationError(format!(
                        "Duplicate serial in request: {}",
                        serial
                    )));
                }
            }
        }
    }
    Ok(())
}

fn generate_invoice_number(kind: TransactionType) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        kind.invoice_prefix(),
        Utc::now().format("%Y%m%d"),
        &suffix[..8]
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> PosRequest {
        PosRequest {
            transaction_type: TransactionType::Sale,
            customer: None,
            items: vec![PosLine {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: 100.0,
                imei_ids: vec![],
                new_serials: vec![],
            }],
            discount_percent: 10.0,
            tax_percent: 18.0,
            payment_method: "cash".to_string(),
            original_sale_id: None,
            notes: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate_request(&base_request()).is_ok());
    }

    #[test]
    fn both_serial_modes_rejected() {
        let mut request = base_request();
        request.items[0].imei_ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        request.items[0].new_serials = vec!["123456789012345".into(), "123456789012346".into()];
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn serial_count_must_match_quantity() {
        let mut request = base_request();
        request.items[0].new_serials = vec!["123456789012345".into()];
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn duplicate_serials_within_request_rejected() {
        let mut request = base_request();
        request.items[0].new_serials =
            vec!["123456789012345".into(), "123456789012345".into()];
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn new_serials_rejected_on_return() {
        let mut request = base_request();
        request.transaction_type = TransactionType::Return;
        request.items[0].new_serials =
            vec!["123456789012345".into(), "123456789012346".into()];
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn invoice_prefix_follows_transaction_type() {
        assert!(generate_invoice_number(TransactionType::Sale).starts_with("INV-"));
        assert!(generate_invoice_number(TransactionType::Return).starts_with("RET-"));
        assert!(generate_invoice_number(TransactionType::Exchange).starts_with("EXC-"));
    }
}
