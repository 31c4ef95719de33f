//! Audit trail side-effect interface.
//!
//! Audit writes must never block or fail the primary operation. The sink is
//! injected so the suppression is visible and testable rather than an inline
//! catch; the recorder spawns each write and the database sink logs and
//! swallows its own errors.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::entities::audit_log;

/// One audit event.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action_type: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub description: String,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
}

impl AuditEntry {
    pub fn new(
        user_id: Option<Uuid>,
        action_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            action_type: action_type.into(),
            target_type: None,
            target_id: None,
            description: description.into(),
            ip_address: None,
            device_info: None,
        }
    }

    pub fn target(mut self, target_type: impl Into<String>, target_id: impl ToString) -> Self {
        self.target_type = Some(target_type.into());
        self.target_id = Some(target_id.to_string());
        self
    }
}

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, entry: AuditEntry);
}

/// Persists audit entries to the audit_logs table. Failures are logged and
/// swallowed.
pub struct DbAuditSink {
    db: Arc<DatabaseConnection>,
}

impl DbAuditSink {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for DbAuditSink {
    async fn write(&self, entry: AuditEntry) {
        let model = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(entry.user_id),
            action_type: Set(entry.action_type.clone()),
            target_type: Set(entry.target_type),
            target_id: Set(entry.target_id),
            description: Set(entry.description),
            ip_address: Set(entry.ip_address),
            device_info: Set(entry.device_info),
            created_at: Set(Utc::now()),
        };

        if let Err(e) = model.insert(&*self.db).await {
            warn!(action = %entry.action_type, "audit log write failed: {}", e);
        }
    }
}

/// Sink that drops everything. Useful in tests that do not assert on audit.
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn write(&self, _entry: AuditEntry) {}
}

/// Fire-and-forget front end over a sink. Cheap to clone and share.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn null() -> Self {
        Self::new(Arc::new(NullAuditSink))
    }

    /// Record an entry without waiting for the write to finish.
    pub fn record(&self, entry: AuditEntry) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            sink.write(entry).await;
        });
    }
}
