use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value;

use crate::database::entities::geojson_templates;
use crate::errors::{CoreError, CoreResult};
use crate::services::authorization::Actor;
use crate::services::epci_service::geometry_source;
use crate::services::validation::ValidationService;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub geojson: Option<Value>,
    pub geojson_url: Option<String>,
    pub is_active: Option<bool>,
}

/// Reusable boundary templates offered when composing maps.
#[derive(Clone)]
pub struct GeojsonTemplateService {
    db: DatabaseConnection,
}

impl GeojsonTemplateService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: TemplateRequest,
    ) -> CoreResult<geojson_templates::Model> {
        actor.require_admin()?;
        let name = ValidationService::validate_title("Template name", &request.name)?;
        let (geojson, geojson_url) = geometry_source(request.geojson, request.geojson_url)?;

        let now = Utc::now();
        Ok(geojson_templates::ActiveModel {
            name: Set(name),
            description: Set(ValidationService::validate_description(
                request.description.as_deref(),
            )?),
            category: Set(clean(request.category)),
            geojson: Set(geojson),
            geojson_url: Set(geojson_url),
            is_active: Set(request.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?)
    }

    /// Optionally restricted to active templates.
    pub async fn list(&self, active_only: bool) -> CoreResult<Vec<geojson_templates::Model>> {
        let mut query = geojson_templates::Entity::find();
        if active_only {
            query = query.filter(geojson_templates::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(geojson_templates::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get(&self, id: i32) -> CoreResult<geojson_templates::Model> {
        geojson_templates::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("GeojsonTemplate", id.to_string()))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        request: TemplateRequest,
    ) -> CoreResult<geojson_templates::Model> {
        actor.require_admin()?;
        let existing = self.get(id).await?;

        let name = ValidationService::validate_title("Template name", &request.name)?;
        let (geojson, geojson_url) = geometry_source(request.geojson, request.geojson_url)?;
        let is_active = request.is_active.unwrap_or(existing.is_active);

        let mut template: geojson_templates::ActiveModel = existing.into();
        template.name = Set(name);
        template.description = Set(ValidationService::validate_description(
            request.description.as_deref(),
        )?);
        template.category = Set(clean(request.category));
        template.geojson = Set(geojson);
        template.geojson_url = Set(geojson_url);
        template.is_active = Set(is_active);
        template.updated_at = Set(Utc::now());

        Ok(template.update(&self.db).await?)
    }

    pub async fn delete(&self, actor: &Actor, id: i32) -> CoreResult<()> {
        actor.require_admin()?;
        let result = geojson_templates::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("GeojsonTemplate", id.to_string()));
        }
        Ok(())
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
