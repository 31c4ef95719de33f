//! Customer management. Phone numbers are the natural key used by the POS
//! upsert, enforced unique at the schema level.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::{customer, pos_sale};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct CustomerInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub gstin: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerHistory {
    #[serde(flatten)]
    pub customer: customer::Model,
    pub sales: Vec<pos_sale::Model>,
}

#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    pub async fn list(&self, search: Option<String>) -> Result<Vec<customer::Model>, ServiceError> {
        let mut query = customer::Entity::find();
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", term);
            query = query.filter(
                Condition::any()
                    .add(customer::Column::Name.like(pattern.clone()))
                    .add(customer::Column::Phone.like(pattern)),
            );
        }
        Ok(query
            .order_by_asc(customer::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", id)))
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CustomerInput,
        actor: &str,
    ) -> Result<customer::Model, ServiceError> {
        let now = Utc::now();
        let created = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            phone: Set(input.phone.filter(|p| !p.is_empty())),
            email: Set(input.email),
            address: Set(input.address),
            city: Set(input.city),
            gstin: Set(input.gstin),
            notes: Set(input.notes),
            status: Set(input.status.unwrap_or_else(|| "active".to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Customer"))?;

        self.audit.record(
            AuditEntry::new(
                None,
                "customer_created",
                format!("Created customer {} by {}", created.name, actor),
            )
            .target("customer", created.id),
        );
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: CustomerInput) -> Result<(), ServiceError> {
        self.get(id).await?;
        customer::Entity::update(customer::ActiveModel {
            id: Set(id),
            name: Set(input.name),
            phone: Set(input.phone.filter(|p| !p.is_empty())),
            email: Set(input.email),
            address: Set(input.address),
            city: Set(input.city),
            gstin: Set(input.gstin),
            notes: Set(input.notes),
            status: Set(input.status.unwrap_or_else(|| "active".to_string())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Customer"))?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid, actor: &str) -> Result<(), ServiceError> {
        let existing = self.get(id).await?;
        customer::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "customer"))?;

        self.audit.record(
            AuditEntry::new(
                None,
                "customer_deleted",
                format!("Deleted customer {} by {}", existing.name, actor),
            )
            .target("customer", id),
        );
        Ok(())
    }

    /// Customer plus their POS transactions, newest first.
    pub async fn purchase_history(&self, id: Uuid) -> Result<CustomerHistory, ServiceError> {
        let found = self.get(id).await?;
        let sales = pos_sale::Entity::find()
            .filter(pos_sale::Column::CustomerId.eq(id))
            .order_by_desc(pos_sale::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(CustomerHistory {
            customer: found,
            sales,
        })
    }
}
