use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::database::entities::{user_sessions, users};
use crate::errors::{CoreError, CoreResult};
use crate::services::authorization::Role;

/// Service for handling authentication operations
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
}

/// Session handed back to the client after a successful login.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub session_id: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub user: users::Model,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Hash a password using bcrypt
    pub fn hash_password(password: &str) -> CoreResult<String> {
        if password.is_empty() {
            return Err(AuthError::ValidationError("Password cannot be empty".to_string()).into());
        }

        if password.len() < 8 {
            return Err(AuthError::ValidationError(
                "Password must be at least 8 characters long".to_string(),
            )
            .into());
        }

        hash(password, DEFAULT_COST)
            .map_err(|e| CoreError::internal("Failed to hash password").with_source(e))
    }

    /// Verify a password against a hash
    pub fn verify_password(password: &str, hash: &str) -> CoreResult<bool> {
        verify(password, hash)
            .map_err(|e| CoreError::internal("Failed to verify password").with_source(e))
    }

    pub fn generate_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Session expiration time (24 hours from now)
    pub fn calculate_session_expiry() -> chrono::DateTime<Utc> {
        Utc::now() + Duration::hours(24)
    }

    pub fn validate_email(email: &str) -> CoreResult<()> {
        let invalid = |message: &str| -> CoreResult<()> {
            Err(AuthError::ValidationError(message.to_string()).into())
        };

        if email.is_empty() {
            return invalid("Email cannot be empty");
        }

        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return invalid("Invalid email format: must contain exactly one @");
        }

        let (local_part, domain_part) = (parts[0], parts[1]);
        if local_part.is_empty() || domain_part.is_empty() {
            return invalid("Invalid email format");
        }

        if !domain_part.contains('.')
            || domain_part.starts_with('.')
            || domain_part.ends_with('.')
        {
            return invalid("Invalid email format: bad domain");
        }

        if email.len() > 254 {
            return invalid("Email is too long");
        }

        Ok(())
    }

    pub fn validate_display_name(display_name: &str) -> CoreResult<()> {
        let trimmed = display_name.trim();
        if trimmed.is_empty() {
            return Err(AuthError::ValidationError("Display name cannot be empty".to_string()).into());
        }
        if trimmed.len() > 100 {
            return Err(AuthError::ValidationError(
                "Display name is too long (max 100 characters)".to_string(),
            )
            .into());
        }
        Ok(())
    }

    pub fn is_session_expired(expires_at: chrono::DateTime<Utc>) -> bool {
        Utc::now() > expires_at
    }

    pub async fn create_user(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        role: Role,
    ) -> CoreResult<users::Model> {
        let email = email.trim().to_lowercase();
        Self::validate_email(&email)?;
        Self::validate_display_name(display_name)?;

        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AuthError::EmailExists.into());
        }

        let mut user = users::ActiveModel::new();
        user.email = Set(email);
        user.display_name = Set(display_name.trim().to_string());
        user.password_hash = Set(Self::hash_password(password)?);
        user.role = Set(role.as_str().to_string());

        let user = user.insert(&self.db).await?;
        info!(user_id = user.id, role = %user.role, "Created user");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> CoreResult<LoginSession> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            return Err(AuthError::AccountDeactivated.into());
        }

        let session_id = Self::generate_session_id();
        let expires_at = Self::calculate_session_expiry();
        user_sessions::ActiveModel {
            session_id: Set(session_id.clone()),
            user_id: Set(user.id),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            expires_at: Set(expires_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        let user: users::ActiveModel = user.into();
        let user = user.set_last_login().update(&self.db).await?;

        info!(user_id = user.id, "User logged in");
        Ok(LoginSession {
            session_id,
            expires_at,
            user,
        })
    }

    /// Deactivate a session; unknown ids are reported as not found.
    pub async fn logout(&self, session_id: &str) -> CoreResult<()> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let mut session: user_sessions::ActiveModel = session.into();
        session.is_active = Set(false);
        session.update(&self.db).await?;
        Ok(())
    }
}

/// Authentication-related errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session not found")]
    SessionNotFound,

    #[error("Email already exists")]
    EmailExists,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::SessionNotFound => {
                CoreError::unauthorized(err.to_string())
            }
            AuthError::EmailExists => CoreError::conflict(err.to_string()),
            AuthError::AccountDeactivated => CoreError::forbidden(err.to_string()),
            AuthError::ValidationError(message) => CoreError::validation(message),
        }
    }
}
