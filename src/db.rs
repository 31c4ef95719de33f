//! Database connection management and startup bootstrap.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::permissions::{default_role_grants, permission_catalog};
use crate::config::AppConfig;
use crate::entities::{permission, role, role_permission, user};
use crate::errors::ServiceError;

/// Open a connection pool from the application configuration.
pub async fn establish_connection(cfg: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(cfg.database_url.clone());
    options
        .max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(cfg.is_development());

    let db = Database::connect(options).await?;
    info!("database connection established");
    Ok(db)
}

/// Apply the versioned migration chain. Safe to re-run: already-applied
/// migrations are skipped, and each migration is itself idempotent.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    use cellstock_migrations::{Migrator, MigratorTrait};
    info!("running database migrations");
    Migrator::up(db, None).await
}

/// Seed the permission catalog, default roles, and their grants.
/// Insert-if-missing; existing rows are left untouched.
pub async fn seed_rbac(db: &DatabaseConnection) -> Result<(), ServiceError> {
    let mut permission_ids: HashMap<String, Uuid> = permission::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.permission_key, p.id))
        .collect();

    for (key, name, module) in permission_catalog() {
        if permission_ids.contains_key(key) {
            continue;
        }
        let id = Uuid::new_v4();
        permission::ActiveModel {
            id: Set(id),
            permission_key: Set(key.to_string()),
            permission_name: Set(name.to_string()),
            module: Set(module.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;
        permission_ids.insert(key.to_string(), id);
    }

    for (role_name, description, grants) in default_role_grants() {
        let role_id = match role::Entity::find()
            .filter(role::Column::RoleName.eq(role_name))
            .one(db)
            .await?
        {
            Some(existing) => existing.id,
            None => {
                let id = Uuid::new_v4();
                role::ActiveModel {
                    id: Set(id),
                    role_name: Set(role_name.to_string()),
                    description: Set(Some(description.to_string())),
                    is_default: Set(true),
                    created_at: Set(Utc::now()),
                }
                .insert(db)
                .await?;
                info!(role = role_name, "seeded default role");
                id
            }
        };

        for key in grants {
            let Some(&permission_id) = permission_ids.get(key) else {
                warn!(permission = key, "grant references unknown permission");
                continue;
            };
            let exists = role_permission::Entity::find()
                .filter(role_permission::Column::RoleId.eq(role_id))
                .filter(role_permission::Column::PermissionId.eq(permission_id))
                .count(db)
                .await?
                > 0;
            if !exists {
                role_permission::ActiveModel {
                    role_id: Set(role_id),
                    permission_id: Set(permission_id),
                }
                .insert(db)
                .await?;
            }
        }
    }

    Ok(())
}

/// Create the bootstrap admin account when the user table is empty.
pub async fn ensure_admin_user(db: &DatabaseConnection, cfg: &AppConfig) -> Result<(), ServiceError> {
    if user::Entity::find().count(db).await? > 0 {
        return Ok(());
    }

    let Some(password) = cfg.admin_password.as_deref() else {
        warn!("no users exist and admin_password is unset; skipping admin bootstrap");
        return Ok(());
    };

    let admin_role = role::Entity::find()
        .filter(role::Column::RoleName.eq("Admin"))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::InternalError("Admin role missing".to_string()))?;

    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(cfg.admin_username.clone()),
        password_hash: Set(crate::auth::hash_password(password)?),
        name: Set("Administrator".to_string()),
        email: Set(None),
        phone: Set(None),
        role_id: Set(admin_role.id),
        status: Set(user::UserStatus::Active.as_str().to_string()),
        failed_login_attempts: Set(0),
        last_login_at: Set(None),
        password_reset_required: Set(true),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;

    info!(username = %cfg.admin_username, "bootstrap admin account created");
    Ok(())
}
