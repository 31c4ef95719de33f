//! Login flow, lockout, token claims and permission resolution.

mod common;

use cellstock_api::audit::AuditRecorder;
use cellstock_api::auth::{permissions as perm, AuthConfig, AuthService};
use cellstock_api::entities::role;
use cellstock_api::errors::ServiceError;
use cellstock_api::services::users::NewUser;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use std::time::Duration;

fn auth_service(db: Arc<DatabaseConnection>) -> AuthService {
    AuthService::new(
        AuthConfig::new(
            "test-secret-key-that-is-long-enough-for-validation".to_string(),
            Duration::from_secs(1800),
            Duration::from_secs(86_400),
        ),
        db,
        AuditRecorder::null(),
    )
}

async fn role_id(db: &DatabaseConnection, name: &str) -> uuid::Uuid {
    role::Entity::find()
        .filter(role::Column::RoleName.eq(name))
        .one(db)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("seeded role {} missing", name))
        .id
}

async fn create_user(
    services: &cellstock_api::handlers::AppServices,
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    role_name: &str,
) {
    services
        .user_admin
        .create_user(
            NewUser {
                username: username.to_string(),
                password: password.to_string(),
                name: username.to_string(),
                email: None,
                phone: None,
                role_id: role_id(db, role_name).await,
                status: None,
            },
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn login_returns_role_permissions_in_claims() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "cash1", "secret123", "Cashier").await;

    let response = auth.login("cash1", "secret123").await.unwrap();
    assert_eq!(response.user.role, "Cashier");
    assert!(response
        .permissions
        .iter()
        .any(|p| p == perm::POS_CREATE_SALE));
    assert!(!response
        .permissions
        .iter()
        .any(|p| p == perm::SETTINGS_MANAGE_USERS));

    let claims = auth.validate_token(&response.tokens.access_token).unwrap();
    assert_eq!(claims.username, "cash1");
    assert_eq!(claims.role, "Cashier");
    assert!(claims.permissions.contains(&perm::POS_CREATE_SALE.to_string()));
}

#[tokio::test]
async fn admin_holds_the_wildcard_permission() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "root", "secret123", "Admin").await;

    let response = auth.login("root", "secret123").await.unwrap();
    assert_eq!(response.permissions, vec![perm::WILDCARD.to_string()]);

    // The wildcard satisfies any permission check.
    let claims = auth.validate_token(&response.tokens.access_token).unwrap();
    assert!(perm::has_permission(
        &claims.permissions,
        perm::SETTINGS_MANAGE_USERS
    ));
    assert!(perm::has_permission(&claims.permissions, perm::POS_CREATE_SALE));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "sam", "secret123", "Staff").await;

    let err = auth.login("sam", "wrong").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));

    let err = auth.login("nobody", "secret123").await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn five_failures_lock_the_account() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "risky", "secret123", "Staff").await;

    for _ in 0..4 {
        let err = auth.login("risky", "wrong").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
    // Fifth failure locks.
    let err = auth.login("risky", "wrong").await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    // Even the right password is refused now.
    let err = auth.login("risky", "secret123").await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn successful_login_resets_the_failure_counter() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "bouncy", "secret123", "Staff").await;

    for _ in 0..3 {
        auth.login("bouncy", "wrong").await.unwrap_err();
    }
    auth.login("bouncy", "secret123").await.unwrap();

    // Three more failures start counting from zero again.
    for _ in 0..3 {
        auth.login("bouncy", "wrong").await.unwrap_err();
    }
    auth.login("bouncy", "secret123").await.unwrap();
}

#[tokio::test]
async fn admin_reset_unlocks_a_locked_account() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "locked-out", "secret123", "Staff").await;

    for _ in 0..5 {
        auth.login("locked-out", "wrong").await.unwrap_err();
    }

    let account = cellstock_api::entities::user::Entity::find()
        .filter(cellstock_api::entities::user::Column::Username.eq("locked-out"))
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.status, "locked");

    services
        .user_admin
        .reset_password(account.id, "newpass99", None)
        .await
        .unwrap();

    let response = auth.login("locked-out", "newpass99").await.unwrap();
    assert!(response.user.password_reset_required);
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "refresher", "secret123", "Manager").await;

    let response = auth.login("refresher", "secret123").await.unwrap();

    let refreshed = auth.refresh(&response.tokens.refresh_token).await.unwrap();
    assert!(!refreshed.access_token.is_empty());

    // An access token cannot be used to refresh.
    let err = auth.refresh(&response.tokens.access_token).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
}

#[tokio::test]
async fn role_permission_replacement_takes_effect_on_next_login() {
    let (db, services) = common::setup().await;
    let auth = auth_service(db.clone());
    create_user(&services, &db, "demoted", "secret123", "Manager").await;

    let manager = role_id(&db, "Manager").await;
    let catalog = services.user_admin.list_permissions().await.unwrap();
    let view_only = catalog
        .iter()
        .find(|p| p.permission_key == perm::INVENTORY_VIEW)
        .unwrap()
        .id;

    services
        .user_admin
        .set_role_permissions(manager, vec![view_only], None)
        .await
        .unwrap();

    let response = auth.login("demoted", "secret123").await.unwrap();
    assert_eq!(response.permissions, vec![perm::INVENTORY_VIEW.to_string()]);
}
