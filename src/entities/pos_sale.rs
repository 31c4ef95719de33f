use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of POS transaction. Returns store negative subtotal/total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Sale,
    Return,
    Exchange,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Return => "return",
            TransactionType::Exchange => "exchange",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sale" => Some(TransactionType::Sale),
            "return" => Some(TransactionType::Return),
            "exchange" => Some(TransactionType::Exchange),
            _ => None,
        }
    }

    /// Invoice-number prefix for this transaction kind.
    pub fn invoice_prefix(&self) -> &'static str {
        match self {
            TransactionType::Sale => "INV",
            TransactionType::Return => "RET",
            TransactionType::Exchange => "EXC",
        }
    }
}

/// One row per sale/return/exchange transaction.
/// `original_sale_id` self-references for returns and exchanges against a
/// prior sale.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "pos_sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub invoice_number: String,
    pub transaction_type: String,
    pub customer_id: Option<Uuid>,
    pub original_sale_id: Option<Uuid>,
    pub subtotal: f64,
    pub discount_percent: f64,
    pub discount_amount: f64,
    pub tax_percent: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub payment_method: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::pos_sale_item::Entity")]
    Items,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::pos_sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_round_trips() {
        for t in [
            TransactionType::Sale,
            TransactionType::Return,
            TransactionType::Exchange,
        ] {
            assert_eq!(TransactionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TransactionType::parse("refund"), None);
    }
}
