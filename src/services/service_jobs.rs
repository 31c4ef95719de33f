//! Repair-ticket workflow: jobs, status history, parts and labor, cost
//! roll-up.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::service_job::{self, ServiceJobStatus};
use crate::entities::{service_labor_charge, service_part_used, service_status_history};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct NewServiceJob {
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_id: Option<Uuid>,
    pub device_name: String,
    pub imei: Option<String>,
    pub problem_description: String,
    pub estimated_cost: f64,
    pub advance_paid: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceJobDetail {
    #[serde(flatten)]
    pub job: service_job::Model,
    pub status_history: Vec<service_status_history::Model>,
    pub parts: Vec<service_part_used::Model>,
    pub labor_charges: Vec<service_labor_charge::Model>,
}

#[derive(Clone)]
pub struct ServiceJobService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl ServiceJobService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: NewServiceJob,
        actor: &str,
    ) -> Result<service_job::Model, ServiceError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let job = service_job::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_number: Set(generate_job_number()),
            customer_name: Set(input.customer_name),
            customer_phone: Set(input.customer_phone),
            customer_id: Set(input.customer_id),
            device_name: Set(input.device_name),
            imei: Set(input.imei),
            problem_description: Set(input.problem_description),
            status: Set(ServiceJobStatus::Received.as_str().to_string()),
            estimated_cost: Set(input.estimated_cost),
            advance_paid: Set(input.advance_paid),
            total_cost: Set(0.0),
            notes: Set(input.notes),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        service_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job.id),
            from_status: Set(None),
            to_status: Set(ServiceJobStatus::Received.as_str().to_string()),
            notes: Set(Some("Job received".to_string())),
            changed_by: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "service_job_created",
                format!("Created service job {} by {}", job.job_number, actor),
            )
            .target("service_job", job.id),
        );
        Ok(job)
    }

    pub async fn list(
        &self,
        status: Option<&str>,
    ) -> Result<Vec<service_job::Model>, ServiceError> {
        let mut query = service_job::Entity::find();
        if let Some(raw) = status {
            let parsed = ServiceJobStatus::parse(raw).ok_or_else(|| {
                ServiceError::ValidationError(format!("Invalid service job status: {}", raw))
            })?;
            query = query.filter(service_job::Column::Status.eq(parsed.as_str()));
        }
        Ok(query
            .order_by_desc(service_job::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<ServiceJobDetail, ServiceError> {
        let job = self.find_job(id).await?;

        let status_history = service_status_history::Entity::find()
            .filter(service_status_history::Column::JobId.eq(id))
            .order_by_asc(service_status_history::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let parts = service_part_used::Entity::find()
            .filter(service_part_used::Column::JobId.eq(id))
            .all(&*self.db)
            .await?;
        let labor_charges = service_labor_charge::Entity::find()
            .filter(service_labor_charge::Column::JobId.eq(id))
            .all(&*self.db)
            .await?;

        Ok(ServiceJobDetail {
            job,
            status_history,
            parts,
            labor_charges,
        })
    }

    /// Transition a job to a new status, appending a history row.
    /// Terminal states (delivered, cancelled) reject further transitions.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        id: Uuid,
        to_status: ServiceJobStatus,
        notes: Option<String>,
        actor: &str,
    ) -> Result<(), ServiceError> {
        let job = self.find_job(id).await?;

        let current = ServiceJobStatus::parse(&job.status).ok_or_else(|| {
            ServiceError::InternalError(format!("unknown job status: {}", job.status))
        })?;
        if current.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Job {} is {} and cannot change status",
                job.job_number,
                current.as_str()
            )));
        }
        if current == to_status {
            return Err(ServiceError::InvalidOperation(format!(
                "Job {} is already {}",
                job.job_number,
                current.as_str()
            )));
        }

        let txn = self.db.begin().await?;
        let now = Utc::now();

        service_job::Entity::update(service_job::ActiveModel {
            id: Set(id),
            status: Set(to_status.as_str().to_string()),
            updated_at: Set(now),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        service_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(id),
            from_status: Set(Some(current.as_str().to_string())),
            to_status: Set(to_status.as_str().to_string()),
            notes: Set(notes),
            changed_by: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                None,
                "service_job_status_changed",
                format!(
                    "Job {}: {} -> {} by {}",
                    job.job_number,
                    current.as_str(),
                    to_status.as_str(),
                    actor
                ),
            )
            .target("service_job", id),
        );
        Ok(())
    }

    /// Add a parts line and re-roll the job's total cost.
    #[instrument(skip(self))]
    pub async fn add_part(
        &self,
        job_id: Uuid,
        part_name: String,
        quantity: i32,
        unit_cost: f64,
    ) -> Result<service_part_used::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Part quantity must be positive".to_string(),
            ));
        }
        self.find_open_job(job_id).await?;

        let txn = self.db.begin().await?;
        let part = service_part_used::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job_id),
            part_name: Set(part_name),
            quantity: Set(quantity),
            unit_cost: Set(unit_cost),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        roll_up_cost(&txn, job_id).await?;
        txn.commit().await?;
        Ok(part)
    }

    /// Add a labor line and re-roll the job's total cost.
    #[instrument(skip(self))]
    pub async fn add_labor_charge(
        &self,
        job_id: Uuid,
        description: String,
        amount: f64,
    ) -> Result<service_labor_charge::Model, ServiceError> {
        self.find_open_job(job_id).await?;

        let txn = self.db.begin().await?;
        let charge = service_labor_charge::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job_id),
            description: Set(description),
            amount: Set(amount),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        roll_up_cost(&txn, job_id).await?;
        txn.commit().await?;
        Ok(charge)
    }

    async fn find_job(&self, id: Uuid) -> Result<service_job::Model, ServiceError> {
        service_job::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service job {} not found", id)))
    }

    async fn find_open_job(&self, id: Uuid) -> Result<service_job::Model, ServiceError> {
        let job = self.find_job(id).await?;
        let status = ServiceJobStatus::parse(&job.status).ok_or_else(|| {
            ServiceError::InternalError(format!("unknown job status: {}", job.status))
        })?;
        if status.is_terminal() {
            return Err(ServiceError::InvalidOperation(format!(
                "Job {} is closed",
                job.job_number
            )));
        }
        Ok(job)
    }
}

/// Recompute total_cost = Σ parts + Σ labor inside the caller's transaction.
async fn roll_up_cost<C: sea_orm::ConnectionTrait>(
    conn: &C,
    job_id: Uuid,
) -> Result<(), ServiceError> {
    let parts = service_part_used::Entity::find()
        .filter(service_part_used::Column::JobId.eq(job_id))
        .all(conn)
        .await?;
    let labor = service_labor_charge::Entity::find()
        .filter(service_labor_charge::Column::JobId.eq(job_id))
        .all(conn)
        .await?;

    let parts_total: f64 = parts
        .iter()
        .map(|p| p.quantity as f64 * p.unit_cost)
        .sum();
    let labor_total: f64 = labor.iter().map(|l| l.amount).sum();

    service_job::Entity::update(service_job::ActiveModel {
        id: Set(job_id),
        total_cost: Set(parts_total + labor_total),
        updated_at: Set(Utc::now()),
        ..Default::default()
    })
    .exec(conn)
    .await?;
    Ok(())
}

fn generate_job_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("SRV-{}-{}", Utc::now().format("%Y%m%d"), &suffix[..8])
}
