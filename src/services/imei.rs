//! IMEI lifecycle: available → sold → (on return) available again.
//!
//! The sold/returned transitions are conditional updates whose affected-row
//! count is asserted against the expected count. Two transactions racing for
//! the same serial cannot both win; the loser aborts with a conflict.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::product_imei::{self, ImeiStatus};
use crate::errors::ServiceError;

/// A serial is exactly 15 numeric characters.
pub fn validate_serial(serial: &str) -> Result<(), ServiceError> {
    if serial.len() != 15 || !serial.chars().all(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(format!(
            "IMEI must be exactly 15 digits: {}",
            serial
        )));
    }
    Ok(())
}

/// Mark serials sold inside the caller's transaction.
///
/// Conditional update guarded on current availability; a row-count mismatch
/// means another transaction claimed one of the serials first.
pub(crate) async fn mark_sold_in<C: ConnectionTrait>(
    conn: &C,
    imei_ids: &[Uuid],
    sale_id: Uuid,
) -> Result<(), ServiceError> {
    if imei_ids.is_empty() {
        return Ok(());
    }
    let result = product_imei::Entity::update_many()
        .col_expr(
            product_imei::Column::Status,
            Expr::value(ImeiStatus::Sold.as_str()),
        )
        .col_expr(product_imei::Column::SaleId, Expr::value(sale_id))
        .col_expr(product_imei::Column::SoldDate, Expr::value(Utc::now()))
        .filter(product_imei::Column::Id.is_in(imei_ids.to_vec()))
        .filter(product_imei::Column::Status.eq(ImeiStatus::Available.as_str()))
        .exec(conn)
        .await?;

    if result.rows_affected != imei_ids.len() as u64 {
        return Err(ServiceError::Conflict(format!(
            "IMEI no longer available: expected to claim {} serials, claimed {}. \
             A concurrent sale may have taken them",
            imei_ids.len(),
            result.rows_affected
        )));
    }
    Ok(())
}

/// Return serials to stock inside the caller's transaction. Requires the
/// prior status to be sold; the row count is asserted symmetrically.
pub(crate) async fn mark_returned_in<C: ConnectionTrait>(
    conn: &C,
    imei_ids: &[Uuid],
) -> Result<(), ServiceError> {
    if imei_ids.is_empty() {
        return Ok(());
    }
    let result = product_imei::Entity::update_many()
        .col_expr(
            product_imei::Column::Status,
            Expr::value(ImeiStatus::Available.as_str()),
        )
        .col_expr(
            product_imei::Column::SaleId,
            Expr::value(Option::<Uuid>::None),
        )
        .col_expr(
            product_imei::Column::SoldDate,
            Expr::value(Option::<chrono::DateTime<Utc>>::None),
        )
        .filter(product_imei::Column::Id.is_in(imei_ids.to_vec()))
        .filter(product_imei::Column::Status.eq(ImeiStatus::Sold.as_str()))
        .exec(conn)
        .await?;

    if result.rows_affected != imei_ids.len() as u64 {
        return Err(ServiceError::Conflict(format!(
            "IMEI not in sold state: expected to return {} serials, returned {}",
            imei_ids.len(),
            result.rows_affected
        )));
    }
    Ok(())
}

/// Insert one available serial inside the caller's transaction.
pub(crate) async fn insert_serial_in<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    serial: &str,
    status: ImeiStatus,
    grn_id: Option<Uuid>,
    stock_movement_id: Option<Uuid>,
    sale_id: Option<Uuid>,
) -> Result<product_imei::Model, ServiceError> {
    validate_serial(serial)?;
    let now = Utc::now();
    product_imei::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        imei: Set(serial.to_string()),
        status: Set(status.as_str().to_string()),
        grn_id: Set(grn_id),
        stock_movement_id: Set(stock_movement_id),
        sale_id: Set(sale_id),
        sold_date: Set(sale_id.map(|_| now)),
        received_date: Set(now),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| ServiceError::from_db_with_context(e, &format!("IMEI {}", serial)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImeiVerification {
    pub exists: bool,
    pub available: bool,
    pub imei: String,
}

#[derive(Clone)]
pub struct ImeiService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl ImeiService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    /// Register serials for a product, all-or-nothing.
    #[instrument(skip(self, serials))]
    pub async fn add_serials(
        &self,
        product_id: Uuid,
        serials: Vec<String>,
        actor: &str,
    ) -> Result<Vec<product_imei::Model>, ServiceError> {
        if serials.is_empty() {
            return Err(ServiceError::ValidationError(
                "No serials supplied".to_string(),
            ));
        }
        for serial in &serials {
            validate_serial(serial)?;
        }

        let txn = self.db.begin().await?;
        let mut created = Vec::with_capacity(serials.len());
        for serial in &serials {
            created.push(
                insert_serial_in(&txn, product_id, serial, ImeiStatus::Available, None, None, None)
                    .await?,
            );
        }
        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "imei_added",
                format!("Added {} serials for product {} by {}", created.len(), product_id, actor),
            )
            .target("product", product_id),
        );
        Ok(created)
    }

    /// Look up a serial on a product and report its availability.
    pub async fn verify(
        &self,
        product_id: Uuid,
        serial: &str,
    ) -> Result<ImeiVerification, ServiceError> {
        let row = product_imei::Entity::find()
            .filter(product_imei::Column::ProductId.eq(product_id))
            .filter(product_imei::Column::Imei.eq(serial))
            .one(&*self.db)
            .await?;

        Ok(match row {
            Some(row) => ImeiVerification {
                exists: true,
                available: ImeiStatus::parse(&row.status) == Some(ImeiStatus::Available),
                imei: row.imei,
            },
            None => ImeiVerification {
                exists: false,
                available: false,
                imei: serial.to_string(),
            },
        })
    }

    /// List a product's serials, optionally filtered by status
    /// (`in_stock` accepted as an alias of `available`).
    pub async fn list_by_product(
        &self,
        product_id: Uuid,
        status: Option<&str>,
    ) -> Result<Vec<product_imei::Model>, ServiceError> {
        let mut query = product_imei::Entity::find()
            .filter(product_imei::Column::ProductId.eq(product_id));

        if let Some(raw) = status {
            let parsed = ImeiStatus::parse(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("Invalid IMEI status: {}", raw))
            })?;
            query = query.filter(product_imei::Column::Status.eq(parsed.as_str()));
        }

        Ok(query
            .order_by_asc(product_imei::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Explicit admin action marking serials sold against a sale id.
    #[instrument(skip(self))]
    pub async fn mark_sold(
        &self,
        imei_ids: Vec<Uuid>,
        sale_id: Uuid,
        actor: &str,
    ) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        mark_sold_in(&txn, &imei_ids, sale_id).await?;
        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "imei_marked_sold",
                format!("Marked {} serials sold by {}", imei_ids.len(), actor),
            )
            .target("pos_sale", sale_id),
        );
        Ok(())
    }

    /// Explicit admin action returning serials to stock.
    #[instrument(skip(self))]
    pub async fn mark_returned(&self, imei_ids: Vec<Uuid>, actor: &str) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        mark_returned_in(&txn, &imei_ids).await?;
        txn.commit().await?;

        self.audit.record(AuditEntry::new(
            None,
            "imei_marked_returned",
            format!("Returned {} serials to stock by {}", imei_ids.len(), actor),
        ));
        Ok(())
    }

    /// Delete a serial. Forbidden once sold, for financial audit integrity.
    #[instrument(skip(self))]
    pub async fn delete(&self, imei_id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let row = product_imei::Entity::find_by_id(imei_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("IMEI {} not found", imei_id)))?;

        match ImeiStatus::parse(&row.status) {
            Some(ImeiStatus::Sold) => {
                return Err(ServiceError::InvalidOperation(format!(
                    "Cannot delete IMEI {}: it has been sold",
                    row.imei
                )));
            }
            Some(ImeiStatus::Available) => {}
            None => {
                return Err(ServiceError::InternalError(format!(
                    "unknown IMEI status: {}",
                    row.status
                )));
            }
        }

        product_imei::Entity::delete_by_id(imei_id)
            .exec(&*self.db)
            .await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "imei_deleted",
                format!("Deleted IMEI {} by {}", row.imei, actor),
            )
            .target("product", row.product_id),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_validation() {
        assert!(validate_serial("123456789012345").is_ok());
        assert!(validate_serial("12345678901234").is_err()); // 14 digits
        assert!(validate_serial("1234567890123456").is_err()); // 16 digits
        assert!(validate_serial("12345678901234a").is_err()); // non-numeric
    }
}
