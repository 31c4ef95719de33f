use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a serialized unit.
///
/// Historical exports used the literal `in_stock` interchangeably with
/// `available`; `parse` accepts it as an alias but the database always
/// stores `available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImeiStatus {
    Available,
    Sold,
}

impl ImeiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImeiStatus::Available => "available",
            ImeiStatus::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" | "in_stock" => Some(ImeiStatus::Available),
            "sold" => Some(ImeiStatus::Sold),
            _ => None,
        }
    }
}

/// One row per physical serialized unit, tracked available → sold →
/// (on return) available again. Deletion is forbidden once sold.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "product_imeis")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub imei: String,
    pub status: String,
    pub grn_id: Option<Uuid>,
    pub stock_movement_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub sold_date: Option<DateTime<Utc>>,
    pub received_date: DateTime<Utc>,
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
    fn in_stock_is_an_alias_of_available() {
        assert_eq!(ImeiStatus::parse("in_stock"), Some(ImeiStatus::Available));
        assert_eq!(ImeiStatus::parse("available"), Some(ImeiStatus::Available));
        assert_eq!(ImeiStatus::parse("sold"), Some(ImeiStatus::Sold));
        assert_eq!(ImeiStatus::parse("reserved"), None);
    }
}
