use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::CoreError;
use crate::services::{Actor, AuthorizationService};

use super::app::AppState;

/// Caller resolved from an `Authorization: Bearer <session id>` header.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub actor: Actor,
    pub session_id: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session_id = bearer_token(parts)
            .ok_or_else(|| CoreError::unauthorized("Authentication required"))?;

        let actor = AuthorizationService::new(state.db.clone())
            .actor_from_session(&session_id)
            .await?;

        Ok(AuthUser { actor, session_id })
    }
}
