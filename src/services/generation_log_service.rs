use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::database::entities::generation_logs;
use crate::errors::{CoreError, CoreResult};
use crate::pipeline::{GenerationLogStore, GenerationRecord};
use crate::services::authorization::Actor;
use crate::services::validation::ValidationService;

/// Admin review of one generation attempt.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLogRequest {
    pub validated: bool,
    pub notes: Option<String>,
    pub corrected_geometry: Option<Value>,
}

#[derive(Clone)]
pub struct GenerationLogService {
    db: DatabaseConnection,
}

impl GenerationLogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Newest first; admins see every attempt, users only their own.
    pub async fn list(&self, actor: &Actor) -> CoreResult<Vec<generation_logs::Model>> {
        let mut query = generation_logs::Entity::find();
        if !actor.is_admin() {
            query = query.filter(generation_logs::Column::UserId.eq(actor.user_id));
        }

        Ok(query
            .order_by_desc(generation_logs::Column::CreatedAt)
            .order_by_desc(generation_logs::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get(&self, actor: &Actor, id: i32) -> CoreResult<generation_logs::Model> {
        let log = generation_logs::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("GenerationLog", id.to_string()))?;

        if !actor.is_admin() && log.user_id != Some(actor.user_id) {
            return Err(CoreError::not_found("GenerationLog", id.to_string()));
        }

        Ok(log)
    }

    pub async fn validate(
        &self,
        actor: &Actor,
        id: i32,
        request: ValidateLogRequest,
    ) -> CoreResult<generation_logs::Model> {
        actor.require_admin()?;

        let corrected_geometry = match request.corrected_geometry {
            None | Some(Value::Null) => None,
            Some(value @ Value::Object(_)) => Some(value.to_string()),
            Some(_) => {
                return Err(CoreError::validation(
                    "Corrected geometry must be a GeoJSON object",
                ))
            }
        };

        let mut log: generation_logs::ActiveModel = self.get(actor, id).await?.into();
        log.validated = Set(request.validated);
        log.validation_notes = Set(ValidationService::validate_description(
            request.notes.as_deref(),
        )?);
        log.corrected_geometry = Set(corrected_geometry);
        log.validated_by = Set(Some(actor.user_id));
        log.validated_at = Set(Some(Utc::now()));

        let log = log.update(&self.db).await?;
        info!(log_id = log.id, validated = log.validated, "Reviewed generation log");
        Ok(log)
    }
}

#[async_trait]
impl GenerationLogStore for GenerationLogService {
    async fn record(&self, record: GenerationRecord) -> CoreResult<i32> {
        let log = generation_logs::ActiveModel {
            user_id: Set(record.user_id),
            prompt: Set(record.prompt),
            raw_response: Set(record.raw_response),
            parsed_response: Set(record.parsed_response.map(|value| value.to_string())),
            success: Set(record.success),
            error_message: Set(record.error_message),
            model_name: Set(record.model_name),
            system_prompt: Set(record.system_prompt),
            duration_ms: Set(record.duration_ms),
            validated: Set(false),
            created_at: Set(record.created_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        Ok(log.id)
    }
}
