use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::database::entities::{epci_records, geojson_templates};
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::auth::AuthUser;
use crate::services::epci_service::{EpciRequest, EpciService};
use crate::services::geojson_template_service::{GeojsonTemplateService, TemplateRequest};

pub async fn list_epci(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<epci_records::Model>>, CoreError> {
    Ok(Json(EpciService::new(state.db).list().await?))
}

pub async fn create_epci(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<EpciRequest>,
) -> Result<Json<epci_records::Model>, CoreError> {
    Ok(Json(EpciService::new(state.db).create(&user.actor, payload).await?))
}

pub async fn get_epci(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<epci_records::Model>, CoreError> {
    Ok(Json(EpciService::new(state.db).get(id).await?))
}

pub async fn update_epci(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<EpciRequest>,
) -> Result<Json<epci_records::Model>, CoreError> {
    Ok(Json(EpciService::new(state.db).update(&user.actor, id, payload).await?))
}

pub async fn delete_epci(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, CoreError> {
    EpciService::new(state.db).delete(&user.actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// Inactive templates are visible to admins only.
pub async fn list_templates(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<TemplateListQuery>,
) -> Result<Json<Vec<geojson_templates::Model>>, CoreError> {
    let active_only = query.active_only || !user.actor.is_admin();
    Ok(Json(
        GeojsonTemplateService::new(state.db)
            .list(active_only)
            .await?,
    ))
}

pub async fn create_template(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<TemplateRequest>,
) -> Result<Json<geojson_templates::Model>, CoreError> {
    Ok(Json(
        GeojsonTemplateService::new(state.db)
            .create(&user.actor, payload)
            .await?,
    ))
}

pub async fn get_template(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i32>,
) -> Result<Json<geojson_templates::Model>, CoreError> {
    Ok(Json(GeojsonTemplateService::new(state.db).get(id).await?))
}

pub async fn update_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<TemplateRequest>,
) -> Result<Json<geojson_templates::Model>, CoreError> {
    Ok(Json(
        GeojsonTemplateService::new(state.db)
            .update(&user.actor, id, payload)
            .await?,
    ))
}

pub async fn delete_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, CoreError> {
    GeojsonTemplateService::new(state.db)
        .delete(&user.actor, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
