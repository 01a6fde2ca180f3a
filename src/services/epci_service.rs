use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::database::entities::epci_records;
use crate::errors::{CoreError, CoreResult};
use crate::services::authorization::Actor;
use crate::services::validation::ValidationService;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpciRequest {
    pub name: String,
    pub siren: Option<String>,
    pub geojson: Option<Value>,
    pub geojson_url: Option<String>,
    pub population: Option<i64>,
    pub area_km2: Option<f64>,
    pub is_active: Option<bool>,
}

/// Inline GeoJSON must be an object; an entity needs inline data or a URL.
pub(crate) fn geometry_source(
    geojson: Option<Value>,
    geojson_url: Option<String>,
) -> CoreResult<(Option<String>, Option<String>)> {
    let geojson = match geojson {
        None | Some(Value::Null) => None,
        Some(value @ Value::Object(_)) => Some(value.to_string()),
        Some(_) => return Err(CoreError::validation("GeoJSON must be a JSON object")),
    };
    let geojson_url = geojson_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    if let Some(url) = &geojson_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::validation("GeoJSON URL must be http(s)"));
        }
    }

    if geojson.is_none() && geojson_url.is_none() {
        return Err(CoreError::validation(
            "Either inline GeoJSON or a GeoJSON URL is required",
        ));
    }

    Ok((geojson, geojson_url))
}

/// EPCI reference records managed from the admin screens.
#[derive(Clone)]
pub struct EpciService {
    db: DatabaseConnection,
}

impl EpciService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, actor: &Actor, request: EpciRequest) -> CoreResult<epci_records::Model> {
        actor.require_admin()?;
        let name = ValidationService::validate_title("EPCI name", &request.name)?;
        let (geojson, geojson_url) = geometry_source(request.geojson, request.geojson_url)?;
        validate_metrics(request.population, request.area_km2)?;

        let now = Utc::now();
        let record = epci_records::ActiveModel {
            name: Set(name),
            siren: Set(request.siren.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())),
            geojson: Set(geojson),
            geojson_url: Set(geojson_url),
            population: Set(request.population),
            area_km2: Set(request.area_km2),
            is_active: Set(request.is_active.unwrap_or(true)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(epci_id = record.id, name = %record.name, "Created EPCI record");
        Ok(record)
    }

    pub async fn list(&self) -> CoreResult<Vec<epci_records::Model>> {
        Ok(epci_records::Entity::find()
            .order_by_asc(epci_records::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get(&self, id: i32) -> CoreResult<epci_records::Model> {
        epci_records::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("EpciRecord", id.to_string()))
    }

    /// Full replacement of the editable fields.
    pub async fn update(
        &self,
        actor: &Actor,
        id: i32,
        request: EpciRequest,
    ) -> CoreResult<epci_records::Model> {
        actor.require_admin()?;
        let existing = self.get(id).await?;

        let name = ValidationService::validate_title("EPCI name", &request.name)?;
        let (geojson, geojson_url) = geometry_source(request.geojson, request.geojson_url)?;
        validate_metrics(request.population, request.area_km2)?;

        let is_active = request.is_active.unwrap_or(existing.is_active);
        let mut record: epci_records::ActiveModel = existing.into();
        record.name = Set(name);
        record.siren = Set(request.siren.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()));
        record.geojson = Set(geojson);
        record.geojson_url = Set(geojson_url);
        record.population = Set(request.population);
        record.area_km2 = Set(request.area_km2);
        record.is_active = Set(is_active);
        record.updated_at = Set(Utc::now());

        Ok(record.update(&self.db).await?)
    }

    pub async fn delete(&self, actor: &Actor, id: i32) -> CoreResult<()> {
        actor.require_admin()?;
        let result = epci_records::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("EpciRecord", id.to_string()));
        }
        Ok(())
    }
}

fn validate_metrics(population: Option<i64>, area_km2: Option<f64>) -> CoreResult<()> {
    if population.is_some_and(|p| p < 0) {
        return Err(CoreError::validation("Population cannot be negative"));
    }
    if area_km2.is_some_and(|a| !a.is_finite() || a < 0.0) {
        return Err(CoreError::validation("Area must be a positive number"));
    }
    Ok(())
}
