use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::database::entities::generation_logs;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::auth::AuthUser;
use crate::services::generation_log_service::{GenerationLogService, ValidateLogRequest};

pub async fn list_logs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<generation_logs::Model>>, CoreError> {
    Ok(Json(GenerationLogService::new(state.db).list(&user.actor).await?))
}

pub async fn get_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<generation_logs::Model>, CoreError> {
    Ok(Json(GenerationLogService::new(state.db).get(&user.actor, id).await?))
}

pub async fn validate_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<ValidateLogRequest>,
) -> Result<Json<generation_logs::Model>, CoreError> {
    let log = GenerationLogService::new(state.db)
        .validate(&user.actor, id, payload)
        .await?;
    Ok(Json(log))
}
