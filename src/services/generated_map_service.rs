use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::database::entities::generated_maps;
use crate::errors::{CoreError, CoreResult};
use crate::geojson::feature_collection_problems;
use crate::services::authorization::Actor;
use crate::services::validation::ValidationService;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMapRequest {
    pub name: String,
    pub description: Option<String>,
    pub prompt: Option<String>,
    pub geojson: Value,
    #[serde(default)]
    pub is_public: bool,
}

/// Maps saved by users from generation results.
#[derive(Clone)]
pub struct GeneratedMapService {
    db: DatabaseConnection,
}

impl GeneratedMapService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist a map. Malformed GeoJSON is logged and stored as-is.
    pub async fn save(
        &self,
        actor: &Actor,
        request: SaveMapRequest,
    ) -> CoreResult<generated_maps::Model> {
        let name = ValidationService::validate_title("Map name", &request.name)?;

        let problems = feature_collection_problems(&request.geojson);
        if !problems.is_empty() {
            warn!(
                owner_id = actor.user_id,
                problems = ?problems,
                "Saving map with malformed GeoJSON"
            );
        }

        let now = Utc::now();
        let map = generated_maps::ActiveModel {
            name: Set(name),
            description: Set(ValidationService::validate_description(
                request.description.as_deref(),
            )?),
            prompt: Set(request.prompt),
            geojson: Set(request.geojson.to_string()),
            owner_id: Set(actor.user_id),
            is_public: Set(request.is_public),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(map_id = map.id, owner_id = map.owner_id, "Saved generated map");
        Ok(map)
    }

    /// The caller's own maps plus every public map, newest first.
    pub async fn list(&self, actor: &Actor) -> CoreResult<Vec<generated_maps::Model>> {
        Ok(generated_maps::Entity::find()
            .filter(
                Condition::any()
                    .add(generated_maps::Column::OwnerId.eq(actor.user_id))
                    .add(generated_maps::Column::IsPublic.eq(true)),
            )
            .order_by_desc(generated_maps::Column::CreatedAt)
            .order_by_desc(generated_maps::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Private maps of other users are reported as missing.
    pub async fn get(&self, actor: &Actor, id: i32) -> CoreResult<generated_maps::Model> {
        let map = generated_maps::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("GeneratedMap", id.to_string()))?;

        if map.is_public || actor.can_manage(map.owner_id) {
            Ok(map)
        } else {
            Err(CoreError::not_found("GeneratedMap", id.to_string()))
        }
    }

    pub async fn set_visibility(
        &self,
        actor: &Actor,
        id: i32,
        is_public: bool,
    ) -> CoreResult<generated_maps::Model> {
        let map = self.get(actor, id).await?;
        if !actor.can_manage(map.owner_id) {
            return Err(CoreError::forbidden("Only the owner can change map visibility"));
        }

        let mut map: generated_maps::ActiveModel = map.into();
        map.is_public = Set(is_public);
        map.updated_at = Set(Utc::now());
        Ok(map.update(&self.db).await?)
    }
}
