use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receiving status, derived from ordered vs received quantities across the
/// order's line items. Never set directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoStatus {
    Pending,
    Partial,
    Completed,
}

impl PoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoStatus::Pending => "pending",
            PoStatus::Partial => "partial",
            PoStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PoStatus::Pending),
            "partial" => Some(PoStatus::Partial),
            "completed" => Some(PoStatus::Completed),
            _ => None,
        }
    }

    /// Derive the status from order totals.
    pub fn derive(total_ordered: i64, total_received: i64) -> Self {
        if total_received >= total_ordered && total_ordered > 0 {
            PoStatus::Completed
        } else if total_received > 0 {
            PoStatus::Partial
        } else {
            PoStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Partial => "partial",
            PaymentStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(PaymentStatus::Unpaid),
            "partial" => Some(PaymentStatus::Partial),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub po_number: String,
    pub supplier_name: String,
    pub supplier_contact: Option<String>,
    pub order_date: NaiveDate,
    pub expected_delivery: Option<NaiveDate>,
    pub status: String,
    pub payment_status: String,
    pub storage_location: Option<String>,
    pub total_amount: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::grn::Entity")]
    Grns,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::grn::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_derivation() {
        assert_eq!(PoStatus::derive(10, 0), PoStatus::Pending);
        assert_eq!(PoStatus::derive(10, 3), PoStatus::Partial);
        assert_eq!(PoStatus::derive(10, 10), PoStatus::Completed);
        // Over-receipt still derives completed.
        assert_eq!(PoStatus::derive(10, 12), PoStatus::Completed);
    }
}
