use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::database::entities::shared_map_links;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::auth::AuthUser;
use crate::services::share_service::{PublicSharedMap, ShareMapRequest, ShareService};

use super::VisibilityRequest;

pub async fn list_shares(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<shared_map_links::Model>>, CoreError> {
    Ok(Json(ShareService::new(state.db).list(&user.actor).await?))
}

pub async fn create_share(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ShareMapRequest>,
) -> Result<Json<shared_map_links::Model>, CoreError> {
    Ok(Json(ShareService::new(state.db).share(&user.actor, payload).await?))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<VisibilityRequest>,
) -> Result<Json<shared_map_links::Model>, CoreError> {
    let link = ShareService::new(state.db)
        .set_visibility(&user.actor, id, payload.is_public)
        .await?;
    Ok(Json(link))
}

pub async fn delete_share(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, CoreError> {
    ShareService::new(state.db).delete(&user.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Anonymous access by share token.
pub async fn resolve_public(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<PublicSharedMap>, CoreError> {
    Ok(Json(ShareService::new(state.db).resolve_public(&token).await?))
}
