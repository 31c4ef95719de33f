use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Repair-ticket workflow state. Delivered and cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceJobStatus {
    Received,
    InDiagnosis,
    AwaitingParts,
    InRepair,
    ReadyForPickup,
    Delivered,
    Cancelled,
}

impl ServiceJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceJobStatus::Received => "received",
            ServiceJobStatus::InDiagnosis => "in_diagnosis",
            ServiceJobStatus::AwaitingParts => "awaiting_parts",
            ServiceJobStatus::InRepair => "in_repair",
            ServiceJobStatus::ReadyForPickup => "ready_for_pickup",
            ServiceJobStatus::Delivered => "delivered",
            ServiceJobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "received" => Some(ServiceJobStatus::Received),
            "in_diagnosis" => Some(ServiceJobStatus::InDiagnosis),
            "awaiting_parts" => Some(ServiceJobStatus::AwaitingParts),
            "in_repair" => Some(ServiceJobStatus::InRepair),
            "ready_for_pickup" => Some(ServiceJobStatus::ReadyForPickup),
            "delivered" => Some(ServiceJobStatus::Delivered),
            "cancelled" => Some(ServiceJobStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServiceJobStatus::Delivered | ServiceJobStatus::Cancelled
        )
    }
}

/// A repair ticket. `total_cost` is rolled up from parts and labor lines on
/// every line change.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "service_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_id: Option<Uuid>,
    pub device_name: String,
    pub imei: Option<String>,
    pub problem_description: String,
    pub status: String,
    pub estimated_cost: f64,
    pub advance_paid: f64,
    pub total_cost: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::service_status_history::Entity")]
    StatusHistory,
    #[sea_orm(has_many = "super::service_part_used::Entity")]
    Parts,
    #[sea_orm(has_many = "super::service_labor_charge::Entity")]
    LaborCharges,
}

impl Related<super::service_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl Related<super::service_part_used::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parts.def()
    }
}

impl Related<super::service_labor_charge::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LaborCharges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(ServiceJobStatus::Delivered.is_terminal());
        assert!(ServiceJobStatus::Cancelled.is_terminal());
        assert!(!ServiceJobStatus::InRepair.is_terminal());
    }
}
