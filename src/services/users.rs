//! User, role and permission administration, plus audit-log queries.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::auth::hash_password;
use crate::entities::user::{self, UserStatus};
use crate::entities::{audit_log, permission, role, role_permission};
use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Option<Uuid>,
}

/// User row with its role name, password hash stripped.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role_id: Uuid,
    pub role_name: Option<String>,
    pub status: String,
    pub failed_login_attempts: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub password_reset_required: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogPage {
    pub logs: Vec<audit_log::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
}

#[derive(Debug, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub action_type: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone)]
pub struct UserAdminService {
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl UserAdminService {
    pub fn new(db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { db, audit }
    }

    pub async fn list_users(&self) -> Result<Vec<UserView>, ServiceError> {
        let rows = user::Entity::find()
            .find_also_related(role::Entity)
            .order_by_desc(user::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(|(u, r)| to_view(u, r)).collect())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserView, ServiceError> {
        let (account, role) = user::Entity::find_by_id(id)
            .find_also_related(role::Entity)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;
        Ok(to_view(account, role))
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(
        &self,
        input: NewUser,
        actor_id: Option<Uuid>,
    ) -> Result<UserView, ServiceError> {
        if input.password.len() < 6 {
            return Err(ServiceError::ValidationError(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        role::Entity::find_by_id(input.role_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role {} not found", input.role_id)))?;

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username.clone()),
            password_hash: Set(hash_password(&input.password)?),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            role_id: Set(input.role_id),
            status: Set(input.status.unwrap_or(UserStatus::Active).as_str().to_string()),
            failed_login_attempts: Set(0),
            last_login_at: Set(None),
            password_reset_required: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Username or email"))?;

        self.audit.record(
            AuditEntry::new(
                actor_id,
                "user_created",
                format!("Created user: {}", input.username),
            )
            .target("user", created.id),
        );
        self.get_user(created.id).await
    }

    #[instrument(skip(self, update))]
    pub async fn update_user(
        &self,
        id: Uuid,
        update: UserUpdate,
        actor_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let existing = user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        if let Some(role_id) = update.role_id {
            role::Entity::find_by_id(role_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Role {} not found", role_id)))?;
        }

        user::Entity::update(user::ActiveModel {
            id: Set(id),
            name: Set(update.name.unwrap_or(existing.name)),
            email: Set(update.email.or(existing.email)),
            phone: Set(update.phone.or(existing.phone)),
            role_id: Set(update.role_id.unwrap_or(existing.role_id)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Email"))?;

        self.audit.record(
            AuditEntry::new(actor_id, "user_updated", format!("Updated user ID: {}", id))
                .target("user", id),
        );
        Ok(())
    }

    /// Activate/deactivate/lock an account.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: Uuid,
        status: UserStatus,
        actor_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        user::Entity::update(user::ActiveModel {
            id: Set(id),
            status: Set(status.as_str().to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&*self.db)
        .await?;

        self.audit.record(
            AuditEntry::new(
                actor_id,
                "user_status_changed",
                format!("Changed user {} status to {}", id, status.as_str()),
            )
            .target("user", id),
        );
        Ok(())
    }

    /// Admin password reset: unlocks the account and forces a change on the
    /// next login.
    #[instrument(skip(self, new_password))]
    pub async fn reset_password(
        &self,
        id: Uuid,
        new_password: &str,
        actor_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if new_password.len() < 6 {
            return Err(ServiceError::ValidationError(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        user::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

        user::Entity::update(user::ActiveModel {
            id: Set(id),
            password_hash: Set(hash_password(new_password)?),
            password_reset_required: Set(true),
            failed_login_attempts: Set(0),
            status: Set(UserStatus::Active.as_str().to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&*self.db)
        .await?;

        self.audit.record(
            AuditEntry::new(
                actor_id,
                "password_reset",
                format!("Reset password for user ID: {}", id),
            )
            .target("user", id),
        );
        Ok(())
    }

    // -- roles & permissions ------------------------------------------------

    pub async fn list_roles(&self) -> Result<Vec<role::Model>, ServiceError> {
        Ok(role::Entity::find()
            .order_by_asc(role::Column::RoleName)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn create_role(
        &self,
        role_name: String,
        description: Option<String>,
        actor_id: Option<Uuid>,
    ) -> Result<role::Model, ServiceError> {
        let created = role::ActiveModel {
            id: Set(Uuid::new_v4()),
            role_name: Set(role_name.clone()),
            description: Set(description),
            is_default: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Role name"))?;

        self.audit.record(
            AuditEntry::new(actor_id, "role_created", format!("Created role: {}", role_name))
                .target("role", created.id),
        );
        Ok(created)
    }

    pub async fn update_role(
        &self,
        id: Uuid,
        role_name: String,
        description: Option<String>,
        actor_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        role::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role {} not found", id)))?;

        role::Entity::update(role::ActiveModel {
            id: Set(id),
            role_name: Set(role_name),
            description: Set(description),
            ..Default::default()
        })
        .exec(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_with_context(e, "Role name"))?;

        self.audit.record(
            AuditEntry::new(actor_id, "role_updated", format!("Updated role ID: {}", id))
                .target("role", id),
        );
        Ok(())
    }

    pub async fn list_permissions(&self) -> Result<Vec<permission::Model>, ServiceError> {
        Ok(permission::Entity::find()
            .order_by_asc(permission::Column::Module)
            .order_by_asc(permission::Column::PermissionName)
            .all(&*self.db)
            .await?)
    }

    pub async fn role_permissions(
        &self,
        role_id: Uuid,
    ) -> Result<Vec<permission::Model>, ServiceError> {
        role::Entity::find_by_id(role_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role {} not found", role_id)))?;

        let rows = role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .find_also_related(permission::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().filter_map(|(_, p)| p).collect())
    }

    /// Replace a role's permission set.
    #[instrument(skip(self, permission_ids))]
    pub async fn set_role_permissions(
        &self,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
        actor_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        role::Entity::find_by_id(role_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Role {} not found", role_id)))?;

        let txn = self.db.begin().await?;
        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(&txn)
            .await?;
        for permission_id in permission_ids {
            role_permission::ActiveModel {
                role_id: Set(role_id),
                permission_id: Set(permission_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| ServiceError::from_db_with_context(e, "Permission"))?;
        }
        txn.commit().await?;

        self.audit.record(
            AuditEntry::new(
                actor_id,
                "permissions_updated",
                format!("Updated permissions for role ID: {}", role_id),
            )
            .target("role", role_id),
        );
        Ok(())
    }

    // -- audit logs ---------------------------------------------------------

    pub async fn audit_logs(&self, filter: AuditLogFilter) -> Result<AuditLogPage, ServiceError> {
        let per_page = filter.per_page.clamp(1, 200);
        let page = filter.page.max(1);

        let mut query = audit_log::Entity::find();
        if let Some(user_id) = filter.user_id {
            query = query.filter(audit_log::Column::UserId.eq(user_id));
        }
        if let Some(action_type) = filter.action_type.filter(|a| !a.is_empty()) {
            query = query.filter(audit_log::Column::ActionType.eq(action_type));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(audit_log::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(audit_log::Column::CreatedAt.lte(end));
        }

        let total = query.clone().count(&*self.db).await?;
        let logs = query
            .order_by_desc(audit_log::Column::CreatedAt)
            .limit(per_page)
            .offset((page - 1) * per_page)
            .all(&*self.db)
            .await?;

        Ok(AuditLogPage {
            logs,
            total,
            page,
            per_page,
            pages: total.div_ceil(per_page),
        })
    }
}

fn to_view(account: user::Model, role: Option<role::Model>) -> UserView {
    UserView {
        id: account.id,
        username: account.username,
        name: account.name,
        email: account.email,
        phone: account.phone,
        role_id: account.role_id,
        role_name: role.map(|r| r.role_name),
        status: account.status,
        failed_login_attempts: account.failed_login_attempts,
        last_login_at: account.last_login_at,
        password_reset_required: account.password_reset_required,
        created_at: account.created_at,
    }
}
