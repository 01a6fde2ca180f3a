use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::database::entities::generated_maps;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::auth::AuthUser;
use crate::services::generated_map_service::{GeneratedMapService, SaveMapRequest};

use super::VisibilityRequest;

pub async fn list_maps(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<generated_maps::Model>>, CoreError> {
    Ok(Json(GeneratedMapService::new(state.db).list(&user.actor).await?))
}

pub async fn save_map(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SaveMapRequest>,
) -> Result<Json<generated_maps::Model>, CoreError> {
    Ok(Json(GeneratedMapService::new(state.db).save(&user.actor, payload).await?))
}

pub async fn get_map(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<generated_maps::Model>, CoreError> {
    Ok(Json(GeneratedMapService::new(state.db).get(&user.actor, id).await?))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<VisibilityRequest>,
) -> Result<Json<generated_maps::Model>, CoreError> {
    let map = GeneratedMapService::new(state.db)
        .set_visibility(&user.actor, id, payload.is_public)
        .await?;
    Ok(Json(map))
}
