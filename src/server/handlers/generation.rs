use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;

use crate::errors::CoreError;
use crate::geojson::FeatureCollection;
use crate::pipeline::{join, parse_csv, JoinKeys, JoinOutput};
use crate::server::app::AppState;
use crate::server::auth::AuthUser;
use crate::services::layer_service::LayerSummary;
use crate::services::{GenerateRequest, GenerationResult};

pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerationResult>, CoreError> {
    let result = state.generation.generate(Some(&user.actor), payload).await?;
    Ok(Json(result))
}

fn default_geo_key() -> String {
    "code".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub csv: String,
    /// Boundary layer from the data directory.
    pub layer: Option<String>,
    /// Inline features, used when no layer is named.
    pub features: Option<FeatureCollection>,
    #[serde(default = "default_geo_key")]
    pub geo_key: String,
    pub geo_key_fallback: Option<String>,
    pub data_key: String,
}

pub async fn join_dataset(
    State(state): State<AppState>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinOutput>, CoreError> {
    let features = match (&payload.layer, payload.features) {
        (Some(layer), _) => state.layers.load(layer).await?,
        (None, Some(features)) => features,
        (None, None) => {
            return Err(CoreError::validation(
                "Either a layer name or inline features is required",
            ))
        }
    };

    let dataset = parse_csv(&payload.csv)?;
    dataset.require_column(&payload.data_key)?;

    let mut keys = JoinKeys::new(payload.geo_key, payload.data_key);
    if let Some(fallback) = payload.geo_key_fallback {
        keys = keys.with_geo_fallback(fallback);
    }

    Ok(Json(join(&features.features, &dataset.rows, &keys)))
}

pub async fn list_layers(
    State(state): State<AppState>,
) -> Result<Json<Vec<LayerSummary>>, CoreError> {
    Ok(Json(state.layers.list().await?))
}

pub async fn get_layer(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<FeatureCollection>, CoreError> {
    Ok(Json(state.layers.load(&name).await?))
}
