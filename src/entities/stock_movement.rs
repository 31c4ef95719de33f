use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cause of a stock movement.
///
/// Quantities are stored SIGNED: purchase/opening_stock/return are positive,
/// sale/exchange/damage negative, adjustment either. The ledger and the
/// materialized `Product::current_stock` agree by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    OpeningStock,
    Purchase,
    Adjustment,
    Sale,
    Return,
    Exchange,
    Damage,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::OpeningStock => "opening_stock",
            MovementType::Purchase => "purchase",
            MovementType::Adjustment => "adjustment",
            MovementType::Sale => "sale",
            MovementType::Return => "return",
            MovementType::Exchange => "exchange",
            MovementType::Damage => "damage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opening_stock" => Some(MovementType::OpeningStock),
            "purchase" => Some(MovementType::Purchase),
            "adjustment" => Some(MovementType::Adjustment),
            "sale" => Some(MovementType::Sale),
            "return" => Some(MovementType::Return),
            "exchange" => Some(MovementType::Exchange),
            "damage" => Some(MovementType::Damage),
            _ => None,
        }
    }
}

/// What a movement refers back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    PurchaseOrder,
    Grn,
    PosSale,
    Manual,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::PurchaseOrder => "purchase_order",
            ReferenceType::Grn => "grn",
            ReferenceType::PosSale => "pos_sale",
            ReferenceType::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase_order" => Some(ReferenceType::PurchaseOrder),
            "grn" => Some(ReferenceType::Grn),
            "pos_sale" => Some(ReferenceType::PosSale),
            "manual" => Some(ReferenceType::Manual),
            _ => None,
        }
    }
}

/// Append-only ledger entry: the single source of truth for stock history.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: String,
    pub quantity: i32,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_type_round_trips() {
        for t in [
            MovementType::OpeningStock,
            MovementType::Purchase,
            MovementType::Adjustment,
            MovementType::Sale,
            MovementType::Return,
            MovementType::Exchange,
            MovementType::Damage,
        ] {
            assert_eq!(MovementType::parse(t.as_str()), Some(t));
        }
        assert_eq!(MovementType::parse("transfer"), None);
    }

    #[test]
    fn reference_type_round_trips() {
        for t in [
            ReferenceType::PurchaseOrder,
            ReferenceType::Grn,
            ReferenceType::PosSale,
            ReferenceType::Manual,
        ] {
            assert_eq!(ReferenceType::parse(t.as_str()), Some(t));
        }
    }
}
