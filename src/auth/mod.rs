//! Authentication and authorization.
//!
//! Bearer-token (JWT) authentication with refresh support, argon2 password
//! hashing, login lockout, and permission-gated routing. Permission checks go
//! through the wildcard-aware matcher in [`permissions`]; the Admin superuser
//! is the data-driven `*` permission, not a role-name comparison.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub mod permissions;

use crate::audit::{AuditEntry, AuditRecorder};
use crate::entities::{permission, role, role_permission, user};
use crate::errors::ServiceError;

const TOKEN_USE_ACCESS: &str = "access";
const TOKEN_USE_REFRESH: &str = "refresh";
const MAX_FAILED_LOGINS: i32 = 5;

/// JWT claims.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub token_use: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from a validated token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn has_permission(&self, required: &str) -> bool {
        permissions::has_permission(&self.permissions, required)
    }
}

/// Extractor: reads the user the auth middleware placed into request
/// extensions. Rejects with 401 when the middleware did not run or the
/// token was invalid.
#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

pub type AuthenticatedUser = AuthUser;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: std::time::Duration,
    pub refresh_token_expiration: std::time::Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        access_token_expiration: std::time::Duration,
        refresh_token_expiration: std::time::Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer: "cellstock-auth".to_string(),
            jwt_audience: "cellstock-api".to_string(),
            access_token_expiration,
            refresh_token_expiration,
        }
    }
}

/// Token pair returned on login and refresh.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: LoginUser,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct LoginUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub password_reset_required: bool,
}

/// Hash a password with argon2id.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Issues and validates tokens, and runs the login flow against the user
/// store.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    audit: AuditRecorder,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>, audit: AuditRecorder) -> Self {
        Self { config, db, audit }
    }

    /// Authenticate by username/password and issue a token pair.
    ///
    /// Tracks failed attempts and locks the account after the fifth failure.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ServiceError> {
        let db = &*self.db;

        let Some((account, role)) = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .find_also_related(role::Entity)
            .one(db)
            .await?
        else {
            return Err(ServiceError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        };

        let role = role.ok_or_else(|| {
            ServiceError::InternalError(format!("user {} has no role", account.username))
        })?;

        match user::UserStatus::parse(&account.status) {
            Some(user::UserStatus::Locked) => {
                return Err(ServiceError::Forbidden(
                    "Account is locked. Contact administrator".to_string(),
                ));
            }
            Some(user::UserStatus::Inactive) => {
                return Err(ServiceError::Forbidden(
                    "Account is inactive. Contact administrator".to_string(),
                ));
            }
            Some(user::UserStatus::Active) => {}
            None => {
                return Err(ServiceError::InternalError(format!(
                    "unknown account status: {}",
                    account.status
                )));
            }
        }

        if !verify_password(password, &account.password_hash) {
            let failed = account.failed_login_attempts + 1;
            let mut update = user::ActiveModel {
                id: Set(account.id),
                failed_login_attempts: Set(failed),
                updated_at: Set(Utc::now()),
                ..Default::default()
            };
            if failed >= MAX_FAILED_LOGINS {
                update.status = Set(user::UserStatus::Locked.as_str().to_string());
            }
            user::Entity::update(update).exec(db).await?;

            if failed >= MAX_FAILED_LOGINS {
                self.audit.record(AuditEntry::new(
                    Some(account.id),
                    "account_locked",
                    "Account locked due to multiple failed login attempts",
                ));
                return Err(ServiceError::Forbidden(
                    "Account locked due to multiple failed login attempts".to_string(),
                ));
            }
            self.audit.record(AuditEntry::new(
                Some(account.id),
                "login_failed",
                format!("Failed login attempt for user {}", username),
            ));
            return Err(ServiceError::Unauthorized(
                "Invalid username or password".to_string(),
            ));
        }

        user::Entity::update(user::ActiveModel {
            id: Set(account.id),
            failed_login_attempts: Set(0),
            last_login_at: Set(Some(Utc::now())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(db)
        .await?;

        let permissions = self.permissions_for_role(role.id).await?;
        let tokens = self.generate_token_pair(&account, &role.role_name, &permissions)?;

        self.audit.record(AuditEntry::new(
            Some(account.id),
            "login_success",
            format!("User {} logged in successfully", username),
        ));

        Ok(LoginResponse {
            tokens,
            user: LoginUser {
                id: account.id,
                username: account.username,
                name: account.name,
                email: account.email,
                role: role.role_name,
                password_reset_required: account.password_reset_required,
            },
            permissions,
        })
    }

    /// Re-issue a token pair from a valid refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ServiceError> {
        let claims = self.validate_token(refresh_token)?;
        if claims.token_use != TOKEN_USE_REFRESH {
            return Err(ServiceError::Unauthorized(
                "Not a refresh token".to_string(),
            ));
        }
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".to_string()))?;

        let Some((account, Some(role))) = user::Entity::find_by_id(user_id)
            .find_also_related(role::Entity)
            .one(&*self.db)
            .await?
        else {
            return Err(ServiceError::Unauthorized("Unknown user".to_string()));
        };

        if user::UserStatus::parse(&account.status) != Some(user::UserStatus::Active) {
            return Err(ServiceError::Forbidden("Account is not active".to_string()));
        }

        let permissions = self.permissions_for_role(role.id).await?;
        self.generate_token_pair(&account, &role.role_name, &permissions)
    }

    /// Resolve the permission keys granted to a role.
    pub async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, ServiceError> {
        let rows = role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .find_also_related(permission::Entity)
            .all(&*self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(_, p)| p.map(|p| p.permission_key))
            .collect())
    }

    fn generate_token_pair(
        &self,
        account: &user::Model,
        role_name: &str,
        permissions: &[String],
    ) -> Result<TokenPair, ServiceError> {
        let access = self.generate_token(
            account,
            role_name,
            permissions,
            TOKEN_USE_ACCESS,
            self.config.access_token_expiration,
        )?;
        // The refresh token carries no permissions; they are re-resolved on
        // refresh so revocations take effect.
        let refresh = self.generate_token(
            account,
            role_name,
            &[],
            TOKEN_USE_REFRESH,
            self.config.refresh_token_expiration,
        )?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    fn generate_token(
        &self,
        account: &user::Model,
        role_name: &str,
        permissions: &[String],
        token_use: &str,
        lifetime: std::time::Duration,
    ) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(lifetime)
                .map_err(|_| ServiceError::InternalError("invalid token duration".to_string()))?;

        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            role: role_name.to_string(),
            permissions: permissions.to_vec(),
            token_use: token_use.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("token creation failed: {}", e)))
    }

    /// Decode and validate a token's signature, expiry and audience.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.clone()]);
        validation.set_issuer(&[self.config.jwt_issuer.clone()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token has expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid authentication token".to_string()),
        })
    }
}

/// Authentication error used by the middleware and extractors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingAuth,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Authentication service not available")]
    ServiceUnavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingAuth | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AuthError::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Validates the bearer token and places the [`AuthUser`] into request
/// extensions. Routes behind this middleware can use the extractor.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => return AuthError::ServiceUnavailable.into_response(),
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return AuthError::MissingAuth.into_response();
    };

    let claims = match auth_service.validate_token(token) {
        Ok(claims) if claims.token_use == TOKEN_USE_ACCESS => claims,
        Ok(_) => return AuthError::InvalidToken.into_response(),
        Err(_) => return AuthError::InvalidToken.into_response(),
    };

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return AuthError::InvalidToken.into_response();
    };

    debug!(user = %claims.username, "request authenticated");
    request.extensions_mut().insert(AuthUser {
        user_id,
        username: claims.username,
        role: claims.role,
        permissions: claims.permissions,
    });

    next.run(request).await
}

/// Rejects with 403 unless the authenticated user holds the required
/// permission (wildcards included).
pub async fn permission_middleware(
    axum::extract::State(required): axum::extract::State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_permission(&required) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Router extensions for attaching auth layers.
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
