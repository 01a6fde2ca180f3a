use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::database::entities::{user_sessions, users};
use crate::errors::{CoreError, CoreResult};
use crate::services::auth_service::AuthService;

/// Account role; admins manage reference data and review generation logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(CoreError::validation(format!("Invalid role: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// Authenticated caller of a service operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i32, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> CoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::forbidden("Access denied: Requires admin role"))
        }
    }

    /// Owners and admins may manage a record.
    pub fn can_manage(&self, owner_id: i32) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

/// Authorization service resolving sessions into actors
#[derive(Clone, Debug)]
pub struct AuthorizationService {
    db: DatabaseConnection,
}

impl AuthorizationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get user from session ID
    pub async fn get_user_from_session(&self, session_id: &str) -> CoreResult<users::Model> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::SessionId.eq(session_id))
            .filter(user_sessions::Column::IsActive.eq(true))
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::unauthorized("Invalid or expired session"))?;

        if AuthService::is_session_expired(session.expires_at) {
            return Err(CoreError::unauthorized("Session expired"));
        }

        let user = users::Entity::find_by_id(session.user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::unauthorized("Invalid or expired session"))?;

        if !user.is_active {
            return Err(CoreError::forbidden("Account is deactivated"));
        }

        Ok(user)
    }

    pub async fn actor_from_session(&self, session_id: &str) -> CoreResult<Actor> {
        let user = self.get_user_from_session(session_id).await?;
        let role = Role::from_str(&user.role)?;
        Ok(Actor::new(user.id, role))
    }
}
